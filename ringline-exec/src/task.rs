use std::future::Future;
use std::pin::Pin;

pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()> + 'static>>;

/// Opaque handle for a task spawned onto an [`Executor`](crate::Executor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) u32);

impl TaskId {
    /// Slot index of the task inside its executor.
    pub fn index(self) -> u32 {
        self.0
    }
}

enum TaskSlot {
    Empty,
    /// Waiting for a wakeup.
    Parked(LocalFuture),
    /// Queued for polling.
    Ready(LocalFuture),
    /// Taken out by the executor and currently being polled.
    Running,
}

/// Growable slab of detached tasks.
///
/// Freed slots are recycled through a free list. A stale wakeup aimed at a
/// recycled slot costs at most one spurious poll of the new occupant.
pub(crate) struct TaskSlab {
    tasks: Vec<TaskSlot>,
    free_list: Vec<u32>,
    live: usize,
}

impl TaskSlab {
    pub(crate) fn new() -> Self {
        TaskSlab {
            tasks: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Insert a task in the Ready state and return its slot index.
    pub(crate) fn spawn(&mut self, future: LocalFuture) -> u32 {
        self.live += 1;
        match self.free_list.pop() {
            Some(idx) => {
                self.tasks[idx as usize] = TaskSlot::Ready(future);
                idx
            }
            None => {
                self.tasks.push(TaskSlot::Ready(future));
                (self.tasks.len() - 1) as u32
            }
        }
    }

    /// Take a Ready task out for polling, leaving the slot marked Running.
    pub(crate) fn take_ready(&mut self, idx: u32) -> Option<LocalFuture> {
        let slot = self.tasks.get_mut(idx as usize)?;
        match std::mem::replace(slot, TaskSlot::Running) {
            TaskSlot::Ready(fut) => Some(fut),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Return a task after it yielded `Poll::Pending`.
    pub(crate) fn park(&mut self, idx: u32, future: LocalFuture) {
        debug_assert!(matches!(self.tasks[idx as usize], TaskSlot::Running));
        self.tasks[idx as usize] = TaskSlot::Parked(future);
    }

    /// Mark a Parked task as Ready. Returns true if the caller should queue it.
    pub(crate) fn wake(&mut self, idx: u32) -> bool {
        let Some(slot) = self.tasks.get_mut(idx as usize) else {
            return false;
        };
        match std::mem::replace(slot, TaskSlot::Empty) {
            TaskSlot::Parked(fut) => {
                *slot = TaskSlot::Ready(fut);
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    /// Release the slot of a finished task.
    pub(crate) fn remove(&mut self, idx: u32) {
        if let Some(slot) = self.tasks.get_mut(idx as usize)
            && !matches!(slot, TaskSlot::Empty)
        {
            *slot = TaskSlot::Empty;
            self.free_list.push(idx);
            self.live -= 1;
        }
    }

    /// Drain every stored future so they can be dropped outside any borrow.
    pub(crate) fn take_all(&mut self) -> Vec<LocalFuture> {
        let mut out = Vec::with_capacity(self.live);
        for slot in &mut self.tasks {
            match std::mem::replace(slot, TaskSlot::Empty) {
                TaskSlot::Parked(fut) | TaskSlot::Ready(fut) => out.push(fut),
                TaskSlot::Empty | TaskSlot::Running => {}
            }
        }
        self.free_list.clear();
        self.tasks.clear();
        self.live = 0;
        out
    }

    /// Number of tasks that have not completed.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    #[cfg(test)]
    fn has_task(&self, idx: u32) -> bool {
        self.tasks
            .get(idx as usize)
            .is_some_and(|s| !matches!(s, TaskSlot::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{Context, Poll};

    struct CountdownFuture(u32);

    impl Future for CountdownFuture {
        type Output = ();
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 == 0 {
                Poll::Ready(())
            } else {
                self.0 -= 1;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn spawn_is_ready() {
        let mut slab = TaskSlab::new();
        let idx = slab.spawn(Box::pin(CountdownFuture(2)));
        assert!(slab.has_task(idx));
        assert!(slab.take_ready(idx).is_some());
        // Running slots still count as occupied.
        assert!(slab.has_task(idx));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn park_then_wake() {
        let mut slab = TaskSlab::new();
        let idx = slab.spawn(Box::pin(CountdownFuture(1)));
        let fut = slab.take_ready(idx).unwrap();
        slab.park(idx, fut);

        assert!(slab.take_ready(idx).is_none());
        assert!(slab.wake(idx));
        assert!(!slab.wake(idx), "second wake must not double-queue");
        assert!(slab.take_ready(idx).is_some());
    }

    #[test]
    fn wake_while_running_is_ignored() {
        let mut slab = TaskSlab::new();
        let idx = slab.spawn(Box::pin(CountdownFuture(1)));
        let fut = slab.take_ready(idx).unwrap();
        assert!(!slab.wake(idx));
        slab.park(idx, fut);
        assert!(slab.wake(idx));
    }

    #[test]
    fn remove_recycles_slot() {
        let mut slab = TaskSlab::new();
        let a = slab.spawn(Box::pin(CountdownFuture(0)));
        let _b = slab.spawn(Box::pin(CountdownFuture(0)));
        slab.remove(a);
        slab.remove(a);
        assert_eq!(slab.len(), 1);
        let c = slab.spawn(Box::pin(CountdownFuture(0)));
        assert_eq!(a, c);
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn wake_out_of_range() {
        let mut slab = TaskSlab::new();
        assert!(!slab.wake(9));
        assert!(slab.take_ready(9).is_none());
    }

    #[test]
    fn take_all_empties_slab() {
        let mut slab = TaskSlab::new();
        slab.spawn(Box::pin(CountdownFuture(0)));
        let idx = slab.spawn(Box::pin(CountdownFuture(3)));
        let fut = slab.take_ready(idx).unwrap();
        slab.park(idx, fut);
        assert_eq!(slab.take_all().len(), 2);
        assert_eq!(slab.len(), 0);
    }
}
