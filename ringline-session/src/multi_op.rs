use std::cell::RefCell;

use ringline_route::{Operation, Reply, ResultCode};

use crate::context::RequestContext;

/// Aggregates one ASCII multi-key retrieval.
///
/// The group owns two contexts of its own. The block context takes the
/// sequence id before the first member and holds the session's head until
/// every member has replied. The end context takes the id after the last
/// member and writes the closing marker, or the first member error if one
/// occurred.
pub(crate) struct MultiOp {
    op: Operation,
    state: RefCell<State>,
}

struct State {
    waiting: usize,
    error: Option<Reply>,
    block: Option<RequestContext>,
    end: Option<RequestContext>,
}

impl MultiOp {
    pub(crate) fn new(op: Operation, block: RequestContext) -> Self {
        MultiOp {
            op,
            state: RefCell::new(State {
                waiting: 0,
                error: None,
                block: Some(block),
                end: None,
            }),
        }
    }

    /// Operation of the first member, reused for the end context.
    pub(crate) fn op(&self) -> Operation {
        self.op
    }

    pub(crate) fn add_member(&self) {
        self.state.borrow_mut().waiting += 1;
    }

    /// Account for one member reply.
    ///
    /// Returns true if the reply was taken as the group's error, in which
    /// case the member must not write it itself.
    pub(crate) fn record_reply(&self, reply: &Reply) -> bool {
        let (stolen, release) = {
            let mut state = self.state.borrow_mut();
            let stolen = state.error.is_none() && !reply.result().is_hit_or_miss();
            if stolen {
                state.error = Some(reply.clone());
            }
            debug_assert!(state.waiting > 0);
            state.waiting = state.waiting.saturating_sub(1);
            (stolen, state.waiting == 0 && state.end.is_some())
        };
        if release {
            self.release();
        }
        stolen
    }

    /// Close the group with its end context.
    pub(crate) fn record_end(&self, end: RequestContext) {
        let release = {
            let mut state = self.state.borrow_mut();
            debug_assert!(state.end.is_none(), "multi-op closed twice");
            state.end = Some(end);
            state.waiting == 0
        };
        if release {
            self.release();
        }
    }

    fn release(&self) {
        let (block, end, error) = {
            let mut state = self.state.borrow_mut();
            (state.block.take(), state.end.take(), state.error.take())
        };
        if let Some(block) = block {
            block.reply(Reply::new(ResultCode::Ok));
        }
        if let Some(end) = end {
            end.reply(error.unwrap_or_else(|| Reply::new(ResultCode::Ok)));
        }
    }
}
