//! Composable memcache routing.
//!
//! A routing tree is built from [`RouteHandle`] nodes: leaves talk to
//! backends (or stand in for them), and fanout policies decide how a request
//! reaches their children and how the children's replies collapse into one.
//! Replies are compared by the severity ladder on [`ResultCode`].
//!
//! Fanout policies that answer before all children finish leave the rest
//! running as detached tasks on the current [`ringline_exec::Executor`].
//!
//! ```rust
//! use std::sync::Arc;
//! use ringline_exec::Executor;
//! use ringline_route::{
//!     AllSyncRoute, ErrorRoute, NullRoute, Request, ResultCode, RouteHandle, RouteHandlePtr,
//! };
//!
//! let children: Vec<RouteHandlePtr> = vec![Arc::new(NullRoute), Arc::new(ErrorRoute::new("down"))];
//! let root = AllSyncRoute::new(children);
//! let ex = Executor::new();
//! let reply = ex
//!     .block_on(async move { root.route(Request::get("k")).await })
//!     .unwrap();
//! assert_eq!(reply.result(), ResultCode::LocalError);
//! ```

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod error;
pub(crate) mod handle;
pub mod hash;
pub(crate) mod metrics;
pub(crate) mod reply;
pub(crate) mod request;
pub(crate) mod result;
pub(crate) mod routes;

// ── Public API ──────────────────────────────────────────────────────────

/// Tree construction errors.
pub use error::Error;
/// The routing capability and traversal.
pub use handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser, route_owned, traverse};
/// Hash functions for [`HashRoute`].
pub use hash::{HashFunc, KetamaHash, Md5Hash};
/// Replies and their ranking.
pub use reply::{Reply, worst_of};
/// Requests.
pub use request::{Operation, Request};
/// Result codes.
pub use result::ResultCode;
/// Routing policies.
pub use routes::{
    AllAsyncRoute, AllFastestRoute, AllInitialRoute, AllMajorityRoute, AllSyncRoute, ErrorRoute,
    HashRoute, NullRoute,
};
