use bytes::Bytes;

use crate::request::Operation;
use crate::result::ResultCode;

/// A reply flowing back from a route toward the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    result: ResultCode,
    value: Bytes,
    flags: u32,
    message: Option<String>,
}

impl Reply {
    pub fn new(result: ResultCode) -> Self {
        Reply {
            result,
            value: Bytes::new(),
            flags: 0,
            message: None,
        }
    }

    /// A hit carrying `value`.
    pub fn found(value: impl Into<Bytes>) -> Self {
        Self::new(ResultCode::Found).with_value(value)
    }

    /// An error reply with a human-readable reason.
    pub fn error(result: ResultCode, message: impl Into<String>) -> Self {
        Self::new(result).with_message(message)
    }

    /// The reply a route gives when it has nothing better to say.
    ///
    /// Retrievals miss, storage commands are not stored, and everything
    /// else is not found.
    pub fn default_for(op: Operation) -> Self {
        if op.is_storage() {
            Self::new(ResultCode::NotStored)
        } else {
            Self::new(ResultCode::NotFound)
        }
    }

    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn result(&self) -> ResultCode {
        self.result
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.result.is_error()
    }

    /// True iff this reply ranks strictly worse than `other`.
    pub fn worse_than(&self, other: &Reply) -> bool {
        self.result.worse_than(other.result)
    }
}

/// Pick the worst reply. Among equally bad replies the earliest wins.
pub fn worst_of(replies: impl IntoIterator<Item = Reply>) -> Option<Reply> {
    replies.into_iter().fold(None, |worst, reply| match worst {
        Some(w) if !reply.worse_than(&w) => Some(w),
        _ => Some(reply),
    })
}
