use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::metrics::DETACHED_CHILDREN;
use crate::reply::Reply;
use crate::request::Request;
use crate::routes::{dispatch_detached, dispatch_failed, traverse_all};

/// Fire-and-forget fanout.
///
/// Every child is started in the background and the caller immediately gets
/// the operation's default reply. Child replies are discarded.
pub struct AllAsyncRoute {
    children: Vec<RouteHandlePtr>,
}

impl AllAsyncRoute {
    pub fn new(children: Vec<RouteHandlePtr>) -> Self {
        AllAsyncRoute { children }
    }
}

impl RouteHandle for AllAsyncRoute {
    fn name(&self) -> &str {
        "all-async"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        let reply = match dispatch_detached(&self.children, &req) {
            Ok(_) => {
                DETACHED_CHILDREN.add(self.children.len() as u64);
                Reply::default_for(req.op())
            }
            Err(e) => dispatch_failed(self.name(), e),
        };
        Box::pin(std::future::ready(reply))
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        traverse_all(&self.children, req, t);
    }
}
