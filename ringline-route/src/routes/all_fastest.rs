use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::metrics::DETACHED_CHILDREN;
use crate::reply::Reply;
use crate::request::Request;
use crate::routes::{dispatch_detached, dispatch_failed, traverse_all};

/// Sends to every child and answers with the first non-error reply.
///
/// If every child fails, the last error to arrive is returned.
pub struct AllFastestRoute {
    children: Vec<RouteHandlePtr>,
}

impl AllFastestRoute {
    pub fn new(children: Vec<RouteHandlePtr>) -> Self {
        AllFastestRoute { children }
    }
}

impl RouteHandle for AllFastestRoute {
    fn name(&self) -> &str {
        "all-fastest"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        Box::pin(async move {
            let mut replies = match dispatch_detached(&self.children, &req) {
                Ok(g) => g,
                Err(e) => return dispatch_failed(self.name(), e),
            };
            let mut last_error = None;
            while let Some((_, reply)) = replies.next().await {
                if !reply.is_error() {
                    DETACHED_CHILDREN.add(replies.outstanding() as u64);
                    return reply;
                }
                last_error = Some(reply);
            }
            last_error.unwrap_or_else(|| Reply::default_for(req.op()))
        })
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        traverse_all(&self.children, req, t);
    }
}
