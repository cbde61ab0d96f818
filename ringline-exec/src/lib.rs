//! Portable single-threaded task executor.
//!
//! Detached tasks live in a slab. Wakers carry the executor id and slot
//! index, pushing both onto a thread-local ready queue that each executor
//! drains for its own tasks. Nothing here touches an I/O backend. The proxy
//! core uses it to run fanout children and to flush write batches
//! between socket events.
//!
//! # Quick Start
//!
//! ```rust
//! use ringline_exec::{Executor, gather, yield_now};
//!
//! async fn after(turns: usize, name: &'static str) -> &'static str {
//!     for _ in 0..turns {
//!         yield_now().await;
//!     }
//!     name
//! }
//!
//! let ex = Executor::new();
//! let first = ex
//!     .block_on(async {
//!         let mut g = gather([after(2, "slow"), after(0, "fast")]).unwrap();
//!         g.next().await
//!     })
//!     .unwrap();
//! assert_eq!(first, Some((1, "fast")));
//! ```

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod error;
pub(crate) mod executor;
pub(crate) mod gather;
pub(crate) mod join;
pub(crate) mod task;
pub(crate) mod waker;
pub(crate) mod yield_now;

// ── Public API ──────────────────────────────────────────────────────────

/// Executor errors.
pub use error::Error;
/// The executor and the free spawn function that targets it.
pub use executor::{Executor, is_entered, spawn};
/// Completion-order fan-in over detached tasks.
pub use gather::{Gather, Next, gather};
/// Wait for a set of borrowed futures.
pub use join::{JoinAll, join_all};
/// Opaque spawned-task handle.
pub use task::TaskId;
/// Cooperative yield point.
pub use yield_now::{YieldNow, yield_now};
