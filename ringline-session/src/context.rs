use std::fmt;
use std::rc::Rc;

use bytes::Bytes;
use ringline_route::{Operation, Reply, ResultCode};

use crate::multi_op::MultiOp;
use crate::session::Session;

/// A request's claim on its session's reply stream.
///
/// Every accepted request gets exactly one context and the context is
/// answered exactly once through [`reply`](RequestContext::reply). A context
/// dropped without a reply answers `LocalError`, so the session's ordering
/// and close accounting never wait on a lost request.
pub struct RequestContext {
    session: Rc<Session>,
    reqid: u64,
    op: Operation,
    noreply: bool,
    parent: Option<Rc<MultiOp>>,
    end_of_multi_op: bool,
    key: Option<Bytes>,
    replied: bool,
}

impl RequestContext {
    pub(crate) fn new(
        session: Rc<Session>,
        reqid: u64,
        op: Operation,
        noreply: bool,
        parent: Option<Rc<MultiOp>>,
    ) -> Self {
        session.on_transaction_started(parent.is_some());
        RequestContext {
            session,
            reqid,
            op,
            noreply,
            parent,
            end_of_multi_op: false,
            key: None,
            replied: false,
        }
    }

    pub(crate) fn end_of_multi_op(mut self) -> Self {
        self.end_of_multi_op = true;
        self
    }

    pub(crate) fn with_key(mut self, key: Bytes) -> Self {
        self.key = Some(key);
        self
    }

    /// Answer the request.
    pub fn reply(mut self, reply: Reply) {
        self.send(reply);
    }

    fn send(&mut self, reply: Reply) {
        if self.replied {
            return;
        }
        self.replied = true;

        if let Some(parent) = &self.parent
            && parent.record_reply(&reply)
        {
            // The group's end marker carries this error instead.
            self.noreply = true;
        }
        self.session.reply(self, &reply);
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    /// Position of this reply in the session's output order.
    pub fn reqid(&self) -> u64 {
        self.reqid
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn noreply(&self) -> bool {
        self.noreply
    }

    /// True for members of an ASCII multi-key retrieval.
    pub fn is_multi_op_member(&self) -> bool {
        self.parent.is_some()
    }

    pub fn is_end_of_multi_op(&self) -> bool {
        self.end_of_multi_op
    }

    /// Request key, kept for framings whose replies echo it.
    pub fn key(&self) -> Option<&Bytes> {
        self.key.as_ref()
    }
}

impl Drop for RequestContext {
    fn drop(&mut self) {
        if !self.replied {
            self.send(Reply::error(
                ResultCode::LocalError,
                "request dropped without a reply",
            ));
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("reqid", &self.reqid)
            .field("op", &self.op)
            .field("noreply", &self.noreply)
            .field("multi_op_member", &self.parent.is_some())
            .field("end_of_multi_op", &self.end_of_multi_op)
            .finish()
    }
}
