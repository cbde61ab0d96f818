use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::metrics::DETACHED_CHILDREN;
use crate::reply::{Reply, worst_of};
use crate::request::Request;
use crate::routes::{dispatch_detached, dispatch_failed, traverse_all};

/// Sends to every child and answers once a majority has replied.
///
/// With `n` children the route waits for the first `n / 2 + 1` replies and
/// returns the worst of them. Stragglers keep running in the background.
pub struct AllMajorityRoute {
    children: Vec<RouteHandlePtr>,
}

impl AllMajorityRoute {
    pub fn new(children: Vec<RouteHandlePtr>) -> Self {
        AllMajorityRoute { children }
    }

    pub fn quorum(&self) -> usize {
        self.children.len() / 2 + 1
    }
}

impl RouteHandle for AllMajorityRoute {
    fn name(&self) -> &str {
        "all-majority"
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
            let quorum = self.quorum();
            let mut seen = Vec::with_capacity(quorum);
            while seen.len() < quorum {
                match replies.next().await {
                    Some((_, reply)) => seen.push(reply),
                    None => break,
                }
            }
            DETACHED_CHILDREN.add(replies.outstanding() as u64);
            worst_of(seen).unwrap_or_else(|| Reply::default_for(req.op()))
        })
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        traverse_all(&self.children, req, t);
    }
}
