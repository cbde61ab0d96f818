use bytes::Bytes;
use ringline_route::{Reply, Request, ResultCode, RouteHandlePtr};
use tracing::warn;

use crate::context::RequestContext;
use crate::session::Session;

/// Receives the requests a session decodes.
///
/// Implementations take ownership of the context and must eventually reply
/// through it, either before returning or from a spawned task.
pub trait OnRequest {
    fn request_ready(&self, ctx: RequestContext, request: Request);

    /// A request the decoder passed through uninterpreted.
    fn typed_request_ready(&self, type_id: u32, body: Bytes, ctx: RequestContext) {
        let _ = body;
        ctx.reply(Reply::error(
            ResultCode::BadCommand,
            format!("unsupported request type {type_id}"),
        ));
    }
}

/// Session lifecycle hooks. Every method defaults to a no-op.
pub trait SessionCallbacks {
    /// All written replies have been acknowledged by the transport.
    fn on_write_quiescence(&self, session: &Session) {
        let _ = session;
    }

    /// The session stopped accepting requests.
    fn on_close_start(&self, session: &Session) {
        let _ = session;
    }

    /// The session is closed and its transport released.
    fn on_close_finish(&self, session: &Session) {
        let _ = session;
    }

    /// A client asked the server to shut down.
    fn on_shutdown(&self, session: &Session) {
        let _ = session;
    }
}

impl SessionCallbacks for () {}

/// Sends every request through a routing tree.
///
/// Each request runs as its own task on the current executor, so slow
/// backends never hold up the session's read loop.
pub struct RouteRequestHandler {
    root: RouteHandlePtr,
}

impl RouteRequestHandler {
    pub fn new(root: RouteHandlePtr) -> Self {
        RouteRequestHandler { root }
    }
}

impl OnRequest for RouteRequestHandler {
    fn request_ready(&self, ctx: RequestContext, request: Request) {
        let root = self.root.clone();
        let spawned = ringline_exec::spawn(async move {
            let reply = root.route(request).await;
            ctx.reply(reply);
        });
        // The context inside the dropped future answers LocalError.
        if let Err(e) = spawned {
            warn!(error = %e, "cannot route request");
        }
    }
}
