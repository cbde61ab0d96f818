use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::reply::Reply;
use crate::request::Request;

/// Future produced by [`RouteHandle::route`].
///
/// Route futures are polled on the single-threaded executor, so they are not
/// required to be `Send`.
pub type RouteFuture<'a> = Pin<Box<dyn Future<Output = Reply> + 'a>>;

/// Shared pointer to a node in a routing tree.
pub type RouteHandlePtr = Arc<dyn RouteHandle>;

/// A node in a routing tree.
///
/// Trees are built once and shared read-only by every connection, so a
/// handle must tolerate many concurrent `route` calls. Any interior state
/// sits behind a lock or an atomic.
pub trait RouteHandle: Send + Sync {
    /// Short policy name for logs.
    fn name(&self) -> &str;

    /// Route `req` and resolve with the reply this node stands behind.
    fn route(&self, req: Request) -> RouteFuture<'_>;

    /// Report the handles `req` would reach, without doing any I/O.
    ///
    /// Composite policies call [`Traverser::visit`] for each child they
    /// would dispatch to. Leaves have nothing below them.
    fn traverse(&self, req: &Request, traverser: &mut Traverser<'_>) {
        let _ = (req, traverser);
    }
}

/// Visitor threaded through [`RouteHandle::traverse`].
pub struct Traverser<'a> {
    visit: &'a mut dyn FnMut(&dyn RouteHandle, &Request),
}

impl<'a> Traverser<'a> {
    pub fn new(visit: &'a mut dyn FnMut(&dyn RouteHandle, &Request)) -> Self {
        Traverser { visit }
    }

    /// Report `child` and then descend into it.
    ///
    /// Composite children are reported too, ahead of their own children, so
    /// a walk sees every handle on the path and not only the leaves.
    pub fn visit(&mut self, child: &RouteHandlePtr, req: &Request) {
        (self.visit)(child.as_ref(), req);
        child.traverse(req, self);
    }
}

/// Walk everything reachable from `root` for `req`, in dispatch order.
pub fn traverse(
    root: &dyn RouteHandle,
    req: &Request,
    mut visit: impl FnMut(&dyn RouteHandle, &Request),
) {
    let mut traverser = Traverser::new(&mut visit);
    root.traverse(req, &mut traverser);
}

/// Route through an owned handle, producing a `'static` future that can be
/// spawned on the executor.
pub fn route_owned(
    handle: RouteHandlePtr,
    req: Request,
) -> impl Future<Output = Reply> + 'static {
    async move { handle.route(req).await }
}
