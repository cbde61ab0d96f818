use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{RawWaker, RawWakerVTable, Waker};

// Waker data packs the executor id above the task index.
const _: () = assert!(usize::BITS >= 64, "waker data needs a 64-bit usize");

static NEXT_EXECUTOR: AtomicU32 = AtomicU32::new(1);

thread_local! {
    /// `(executor, task index)` pairs woken since their executor last
    /// drained the queue.
    static WOKEN: RefCell<VecDeque<(u32, u32)>> = const { RefCell::new(VecDeque::new()) };
}

/// A process-unique tag for a new executor's wakers.
pub(crate) fn next_executor_id() -> u32 {
    NEXT_EXECUTOR.fetch_add(1, Ordering::Relaxed)
}

/// Create a [`Waker`] that re-schedules task `task_idx` of `executor`.
///
/// Both numbers are carried in the data pointer, so creating and cloning
/// wakers never allocates. Waking from another thread pushes onto that
/// thread's queue and is lost; tasks on this executor are woken only by each
/// other.
pub(crate) fn task_waker(executor: u32, task_idx: u32) -> Waker {
    let data = (((executor as usize) << 32) | task_idx as usize) as *const ();
    // SAFETY: the vtable functions below only reinterpret `data` as an
    // integer and never dereference it.
    unsafe { Waker::from_raw(RawWaker::new(data, &VTABLE)) }
}

const VTABLE: RawWakerVTable = RawWakerVTable::new(clone_fn, wake_fn, wake_by_ref_fn, drop_fn);

unsafe fn clone_fn(data: *const ()) -> RawWaker {
    RawWaker::new(data, &VTABLE)
}

unsafe fn wake_fn(data: *const ()) {
    // SAFETY: same contract as wake_by_ref_fn.
    unsafe { wake_by_ref_fn(data) };
}

unsafe fn wake_by_ref_fn(data: *const ()) {
    let bits = data as usize;
    let wake = ((bits >> 32) as u32, bits as u32);
    WOKEN.with(|q| q.borrow_mut().push_back(wake));
}

unsafe fn drop_fn(_data: *const ()) {}

/// Move the indices woken for `executor` into `buf`, preserving wake order.
/// Wakeups for other executors stay queued.
pub(crate) fn drain_woken(executor: u32, buf: &mut VecDeque<u32>) {
    WOKEN.with(|q| {
        q.borrow_mut().retain(|&(owner, idx)| {
            if owner == executor {
                buf.push_back(idx);
                false
            } else {
                true
            }
        })
    });
}

/// Drop the wakeups still queued for `executor`.
pub(crate) fn forget_woken(executor: u32) {
    WOKEN.with(|q| q.borrow_mut().retain(|&(owner, _)| owner != executor));
}
