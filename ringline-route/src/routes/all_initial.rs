use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::metrics::DETACHED_CHILDREN;
use crate::reply::Reply;
use crate::request::Request;
use crate::routes::{dispatch_detached, dispatch_failed, traverse_all};

/// Sends to every child but answers with the first child's reply.
///
/// The reply is returned as soon as child 0 finishes; the others keep
/// running in the background and their replies are dropped.
pub struct AllInitialRoute {
    children: Vec<RouteHandlePtr>,
}

impl AllInitialRoute {
    pub fn new(children: Vec<RouteHandlePtr>) -> Self {
        AllInitialRoute { children }
    }
}

impl RouteHandle for AllInitialRoute {
    fn name(&self) -> &str {
        "all-initial"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        Box::pin(async move {
            if self.children.is_empty() {
                return Reply::default_for(req.op());
            }
            let mut replies = match dispatch_detached(&self.children, &req) {
                Ok(g) => g,
                Err(e) => return dispatch_failed(self.name(), e),
            };
            while let Some((idx, reply)) = replies.next().await {
                if idx == 0 {
                    DETACHED_CHILDREN.add(replies.outstanding() as u64);
                    return reply;
                }
            }
            Reply::default_for(req.op())
        })
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        traverse_all(&self.children, req, t);
    }
}
