use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::error::Error;
use crate::task::{LocalFuture, TaskId, TaskSlab};
use crate::waker::{drain_woken, forget_woken, next_executor_id, task_waker};

pub(crate) struct Shared {
    slab: TaskSlab,
    ready: VecDeque<u32>,
}

pub(crate) type SharedHandle = Rc<RefCell<Shared>>;

impl Shared {
    pub(crate) fn spawn(&mut self, future: LocalFuture) -> TaskId {
        let idx = self.slab.spawn(future);
        self.ready.push_back(idx);
        TaskId(idx)
    }
}

thread_local! {
    static CURRENT: RefCell<Option<SharedHandle>> = const { RefCell::new(None) };
}

/// Handle to the executor entered on this thread, if any.
pub(crate) fn current() -> Option<SharedHandle> {
    CURRENT.with(|c| c.borrow().clone())
}

/// Restores the previously entered executor on drop.
struct EnterGuard {
    prev: Option<SharedHandle>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        CURRENT.with(|c| *c.borrow_mut() = prev);
    }
}

/// Single-threaded cooperative executor.
///
/// Tasks are `'static` local futures; they may hold `Rc` and `RefCell`
/// state. The executor never runs on its own: callers drive it with
/// [`run_until_stalled`](Executor::run_until_stalled) or
/// [`block_on`](Executor::block_on). While driven (or inside
/// [`enter`](Executor::enter)) the free function [`spawn`] targets it.
///
/// Several executors may share a thread. Each tags its wakers, so a wakeup
/// only ever reaches the executor that issued the waker.
pub struct Executor {
    id: u32,
    shared: SharedHandle,
}

impl Executor {
    pub fn new() -> Self {
        Executor {
            id: next_executor_id(),
            shared: Rc::new(RefCell::new(Shared {
                slab: TaskSlab::new(),
                ready: VecDeque::new(),
            })),
        }
    }

    /// Spawn a detached task. It is first polled on the next run.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> TaskId {
        self.shared.borrow_mut().spawn(Box::pin(future))
    }

    /// Run `f` with this executor installed as the spawn target.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.install();
        f()
    }

    /// Poll ready tasks until none is left ready.
    ///
    /// Returns the number of polls performed.
    pub fn run_until_stalled(&self) -> usize {
        let _guard = self.install();
        let mut woken = VecDeque::new();
        let mut polls = 0;

        loop {
            drain_woken(self.id, &mut woken);
            {
                let mut shared = self.shared.borrow_mut();
                for idx in woken.drain(..) {
                    if shared.slab.wake(idx) {
                        shared.ready.push_back(idx);
                    }
                }
            }

            let next = self.shared.borrow_mut().ready.pop_front();
            let Some(idx) = next else {
                break;
            };

            let Some(mut future) = self.shared.borrow_mut().slab.take_ready(idx) else {
                continue;
            };

            // No borrow of the shared state is held while polling; the task
            // may spawn or wake freely.
            let waker = task_waker(self.id, idx);
            let mut cx = Context::from_waker(&waker);
            polls += 1;
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    self.shared.borrow_mut().slab.remove(idx);
                    drop(future);
                }
                Poll::Pending => self.shared.borrow_mut().slab.park(idx, future),
            }
        }

        polls
    }

    /// Drive `future` to completion on this executor.
    ///
    /// Other tasks run alongside it. Fails with [`Error::Stalled`] if every
    /// task is parked while `future` is still pending.
    pub fn block_on<T: 'static>(
        &self,
        future: impl Future<Output = T> + 'static,
    ) -> Result<T, Error> {
        let slot = Rc::new(RefCell::new(None));
        let out = slot.clone();
        self.spawn(async move {
            let value = future.await;
            *out.borrow_mut() = Some(value);
        });
        self.run_until_stalled();
        slot.borrow_mut().take().ok_or(Error::Stalled)
    }

    /// Number of spawned tasks that have not completed.
    pub fn task_count(&self) -> usize {
        self.shared.borrow().slab.len()
    }

    fn install(&self) -> EnterGuard {
        let prev = CURRENT.with(|c| c.borrow_mut().replace(self.shared.clone()));
        EnterGuard { prev }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Dropped futures may release Rc handles that reach back into the
        // executor, so no borrow may be live while they drop.
        let tasks = self.shared.borrow_mut().slab.take_all();
        drop(tasks);
        forget_woken(self.id);
    }
}

/// Spawn a detached task on the executor entered on this thread.
///
/// The task keeps running after the caller returns; its output is discarded.
/// Fails with [`Error::OutsideExecutor`] when no executor is entered.
pub fn spawn(future: impl Future<Output = ()> + 'static) -> Result<TaskId, Error> {
    let shared = current().ok_or(Error::OutsideExecutor)?;
    let id = shared.borrow_mut().spawn(Box::pin(future));
    Ok(id)
}

/// Whether [`spawn`] would succeed on this thread.
pub fn is_entered() -> bool {
    CURRENT.with(|c| c.borrow().is_some())
}
