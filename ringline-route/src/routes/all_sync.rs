use ringline_exec::join_all;

use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::reply::{Reply, worst_of};
use crate::request::Request;
use crate::routes::traverse_all;

/// Sends the request to every child and waits for all of them.
///
/// Children run concurrently inside the caller's task. The reply is the
/// worst child reply; among equally bad replies the first child wins.
pub struct AllSyncRoute {
    children: Vec<RouteHandlePtr>,
}

impl AllSyncRoute {
    pub fn new(children: Vec<RouteHandlePtr>) -> Self {
        AllSyncRoute { children }
    }
}

impl RouteHandle for AllSyncRoute {
    fn name(&self) -> &str {
        "all-sync"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        Box::pin(async move {
            let op = req.op();
            let replies = join_all(
                self.children
                    .iter()
                    .map(|child| child.route(req.clone())),
            )
            .await;
            worst_of(replies).unwrap_or_else(|| Reply::default_for(op))
        })
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        traverse_all(&self.children, req, t);
    }
}
