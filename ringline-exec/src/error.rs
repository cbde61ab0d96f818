use thiserror::Error;

/// Errors returned by the executor.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `spawn` or `gather` was called with no executor entered on this thread.
    #[error("called outside executor")]
    OutsideExecutor,
    /// Every task parked before the awaited future completed.
    #[error("executor stalled before completion")]
    Stalled,
}
