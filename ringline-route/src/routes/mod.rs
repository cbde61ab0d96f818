//! Routing policies.

mod all_async;
mod all_fastest;
mod all_initial;
mod all_majority;
mod all_sync;
mod error;
mod hash;
mod null;

pub use all_async::AllAsyncRoute;
pub use all_fastest::AllFastestRoute;
pub use all_initial::AllInitialRoute;
pub use all_majority::AllMajorityRoute;
pub use all_sync::AllSyncRoute;
pub use error::ErrorRoute;
pub use hash::HashRoute;
pub use null::NullRoute;

use ringline_exec::Gather;
use tracing::error;

use crate::handle::{RouteHandlePtr, Traverser, route_owned};
use crate::metrics::DISPATCH_FAILURES;
use crate::reply::Reply;
use crate::request::Request;
use crate::result::ResultCode;

/// Start every child as a detached task, each with its own copy of `req`.
pub(crate) fn dispatch_detached(
    children: &[RouteHandlePtr],
    req: &Request,
) -> Result<Gather<Reply>, ringline_exec::Error> {
    ringline_exec::gather(
        children
            .iter()
            .map(|child| route_owned(child.clone(), req.clone())),
    )
}

/// Reply used when a fanout cannot be started at all.
pub(crate) fn dispatch_failed(route: &str, err: ringline_exec::Error) -> Reply {
    DISPATCH_FAILURES.increment();
    error!(route, %err, "failed to dispatch fanout");
    Reply::error(ResultCode::LocalError, format!("{route}: {err}"))
}

pub(crate) fn traverse_all(children: &[RouteHandlePtr], req: &Request, t: &mut Traverser<'_>) {
    for child in children {
        t.visit(child, req);
    }
}
