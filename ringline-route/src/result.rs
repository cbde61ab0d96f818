use std::fmt;

/// Outcome of a single operation, ordered by [`severity`](ResultCode::severity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    // -- Success --
    Ok,
    Stored,
    StaleStored,
    Exists,
    Deleted,
    Found,
    Touched,

    // -- Miss --
    Waiting,
    NotFound,
    NotStored,

    // -- Error --
    /// Request was answered out of order by a backend.
    Ooo,
    Timeout,
    ConnectTimeout,
    ConnectError,
    Busy,
    TryAgain,
    Shutdown,
    /// Backend marked down.
    Tko,
    BadCommand,
    BadKey,
    BadFlags,
    BadExptime,
    BadLeaseId,
    BadCasId,
    BadValue,
    Aborted,
    ClientError,
    LocalError,
    RemoteError,

    Unknown,
}

impl ResultCode {
    /// Coarse rank used when combining replies: higher is worse.
    ///
    /// Success codes rank 1, misses 2, errors 3 and `Unknown` 4.
    pub fn severity(self) -> u8 {
        use ResultCode::*;
        match self {
            Ok | Stored | StaleStored | Exists | Deleted | Found | Touched => 1,
            Waiting | NotFound | NotStored => 2,
            Ooo | Timeout | ConnectTimeout | ConnectError | Busy | TryAgain | Shutdown | Tko
            | BadCommand | BadKey | BadFlags | BadExptime | BadLeaseId | BadCasId | BadValue
            | Aborted | ClientError | LocalError | RemoteError => 3,
            Unknown => 4,
        }
    }

    /// True iff `self` ranks strictly worse than `other`.
    pub fn worse_than(self, other: ResultCode) -> bool {
        self.severity() > other.severity()
    }

    pub fn is_error(self) -> bool {
        self.severity() >= 3
    }

    /// A hit or a miss: the two outcomes a multi-get member may report
    /// without failing the whole batch.
    pub fn is_hit_or_miss(self) -> bool {
        matches!(self, ResultCode::Found | ResultCode::NotFound)
    }

    /// Errors raised because the client sent something malformed.
    pub fn is_client_error(self) -> bool {
        use ResultCode::*;
        matches!(
            self,
            BadCommand
                | BadKey
                | BadFlags
                | BadExptime
                | BadLeaseId
                | BadCasId
                | BadValue
                | ClientError
        )
    }

    pub fn as_str(self) -> &'static str {
        use ResultCode::*;
        match self {
            Ok => "ok",
            Stored => "stored",
            StaleStored => "stale_stored",
            Exists => "exists",
            Deleted => "deleted",
            Found => "found",
            Touched => "touched",
            Waiting => "waiting",
            NotFound => "notfound",
            NotStored => "notstored",
            Ooo => "ooo",
            Timeout => "timeout",
            ConnectTimeout => "connect_timeout",
            ConnectError => "connect_error",
            Busy => "busy",
            TryAgain => "try_again",
            Shutdown => "shutdown",
            Tko => "tko",
            BadCommand => "bad_command",
            BadKey => "bad_key",
            BadFlags => "bad_flags",
            BadExptime => "bad_exptime",
            BadLeaseId => "bad_lease_id",
            BadCasId => "bad_cas_id",
            BadValue => "bad_value",
            Aborted => "aborted",
            ClientError => "client_error",
            LocalError => "local_error",
            RemoteError => "remote_error",
            Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
