//! Routable memcache requests.

use std::fmt;

use bytes::Bytes;

/// Memcache operation kinds understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // -- Retrieval --
    Get,
    Gets,
    LeaseGet,
    Metaget,

    // -- Storage --
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Cas,

    // -- Mutation --
    Delete,
    Incr,
    Decr,
    Touch,

    // -- Session control --
    Version,
    Quit,
    Shutdown,

    // -- Misc --
    Stats,
    FlushAll,
    Unknown,
}

impl Operation {
    /// Retrieval commands. In the ASCII framing these may arrive as one
    /// line with many keys and are grouped into a multi-op.
    pub fn is_get_family(self) -> bool {
        matches!(
            self,
            Operation::Get | Operation::Gets | Operation::LeaseGet | Operation::Metaget
        )
    }

    /// Commands that write a value and answer stored / not-stored.
    pub fn is_storage(self) -> bool {
        matches!(
            self,
            Operation::Set
                | Operation::Add
                | Operation::Replace
                | Operation::Append
                | Operation::Prepend
                | Operation::Cas
        )
    }

    /// Commands that carry a key and can be routed to a backend.
    pub fn is_keyed(self) -> bool {
        self.is_get_family()
            || self.is_storage()
            || matches!(
                self,
                Operation::Delete | Operation::Incr | Operation::Decr | Operation::Touch
            )
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Gets => "gets",
            Operation::LeaseGet => "lease-get",
            Operation::Metaget => "metaget",
            Operation::Set => "set",
            Operation::Add => "add",
            Operation::Replace => "replace",
            Operation::Append => "append",
            Operation::Prepend => "prepend",
            Operation::Cas => "cas",
            Operation::Delete => "delete",
            Operation::Incr => "incr",
            Operation::Decr => "decr",
            Operation::Touch => "touch",
            Operation::Version => "version",
            Operation::Quit => "quit",
            Operation::Shutdown => "shutdown",
            Operation::Stats => "stats",
            Operation::FlushAll => "flush_all",
            Operation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded request.
///
/// Cloning is cheap: key and value are reference-counted [`Bytes`], so every
/// child of a fanout receives its own copy without duplicating payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    op: Operation,
    key: Bytes,
    value: Option<Bytes>,
    flags: u32,
    exptime: u32,
    delta: u64,
    cas_unique: u64,
}

impl Request {
    pub fn new(op: Operation, key: impl Into<Bytes>) -> Self {
        Request {
            op,
            key: key.into(),
            value: None,
            flags: 0,
            exptime: 0,
            delta: 0,
            cas_unique: 0,
        }
    }

    /// Create a GET request.
    pub fn get(key: impl Into<Bytes>) -> Self {
        Self::new(Operation::Get, key)
    }

    /// Create a SET request.
    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new(Operation::Set, key).with_value(value)
    }

    /// Create a DELETE request.
    pub fn delete(key: impl Into<Bytes>) -> Self {
        Self::new(Operation::Delete, key)
    }

    /// A request without a key (`version`, `quit`, `shutdown`, ...).
    pub fn control(op: Operation) -> Self {
        Self::new(op, Bytes::new())
    }

    pub fn with_value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_exptime(mut self, exptime: u32) -> Self {
        self.exptime = exptime;
        self
    }

    /// Amount for `incr` / `decr`.
    pub fn with_delta(mut self, delta: u64) -> Self {
        self.delta = delta;
        self
    }

    /// CAS token for `cas`.
    pub fn with_cas(mut self, cas_unique: u64) -> Self {
        self.cas_unique = cas_unique;
        self
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn exptime(&self) -> u32 {
        self.exptime
    }

    pub fn delta(&self) -> u64 {
        self.delta
    }

    pub fn cas_unique(&self) -> u64 {
        self.cas_unique
    }
}
