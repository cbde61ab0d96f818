use crate::handle::{RouteFuture, RouteHandle};
use crate::reply::Reply;
use crate::request::Request;

/// Answers every request with the operation's default reply.
///
/// Gets miss, storage commands come back not-stored, and everything else is
/// not found. Useful as a black hole and as the tail of a failover chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRoute;

impl RouteHandle for NullRoute {
    fn name(&self) -> &str {
        "null"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        Box::pin(std::future::ready(Reply::default_for(req.op())))
    }
}
