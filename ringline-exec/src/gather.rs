use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::Error;
use crate::executor::current;

struct GatherState<T> {
    completed: VecDeque<(usize, T)>,
    outstanding: usize,
    waker: Option<Waker>,
}

pin_project_lite::pin_project! {
    /// Detached wrapper that files its member's output with the gather state.
    struct Collect<F: Future> {
        #[pin]
        future: F,
        index: usize,
        state: Rc<RefCell<GatherState<F::Output>>>,
    }
}

impl<F: Future> Future for Collect<F> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.project();
        let output = match this.future.poll(cx) {
            Poll::Ready(output) => output,
            Poll::Pending => return Poll::Pending,
        };
        let waker = {
            let mut state = this.state.borrow_mut();
            state.completed.push_back((*this.index, output));
            state.outstanding -= 1;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        Poll::Ready(())
    }
}

/// Completion-order receiver for a set of detached futures.
///
/// Dropping a `Gather` does not cancel its members: they run to completion
/// on the executor and their outputs are discarded.
pub struct Gather<T> {
    state: Rc<RefCell<GatherState<T>>>,
    total: usize,
}

impl<T> Gather<T> {
    /// Wait for the next member to finish.
    ///
    /// Yields `(index, output)` in completion order, where `index` is the
    /// member's position in the input. Returns `None` once every output has
    /// been delivered.
    pub fn next(&mut self) -> Next<'_, T> {
        Next { gather: self }
    }

    /// Number of members that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.state.borrow().outstanding
    }

    /// Number of members this gather was started with.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Future returned by [`Gather::next`].
#[must_use = "futures do nothing unless awaited"]
pub struct Next<'a, T> {
    gather: &'a mut Gather<T>,
}

impl<T> Future for Next<'_, T> {
    type Output = Option<(usize, T)>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.gather.state.borrow_mut();
        if let Some(item) = state.completed.pop_front() {
            return Poll::Ready(Some(item));
        }
        if state.outstanding == 0 {
            return Poll::Ready(None);
        }
        state.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

/// Spawn every future as a detached task and collect outputs as they land.
///
/// All members are spawned before this returns, so each one starts on the
/// next executor pass regardless of how the caller consumes the results.
/// Fails with [`Error::OutsideExecutor`] when no executor is entered; in that
/// case nothing is spawned.
pub fn gather<I, F>(futures: I) -> Result<Gather<F::Output>, Error>
where
    I: IntoIterator<Item = F>,
    F: Future + 'static,
    F::Output: 'static,
{
    let executor = current().ok_or(Error::OutsideExecutor)?;
    let state = Rc::new(RefCell::new(GatherState {
        completed: VecDeque::new(),
        outstanding: 0,
        waker: None,
    }));

    let mut total = 0;
    for (index, future) in futures.into_iter().enumerate() {
        state.borrow_mut().outstanding += 1;
        let collect = Collect {
            future,
            index,
            state: state.clone(),
        };
        executor.borrow_mut().spawn(Box::pin(collect));
        total += 1;
    }

    Ok(Gather { state, total })
}
