use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

/// Outcome of handing a vectored write to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every byte was accepted.
    Complete,
    /// The write is queued. Completion is reported later through
    /// [`Session::write_success`](crate::Session::write_success) or
    /// [`Session::write_error`](crate::Session::write_error).
    Pending,
}

/// Byte stream underneath a session.
///
/// Implementations never call back into the session from inside these
/// methods; outcomes are returned, and asynchronous completions are
/// delivered later by whoever drives the socket.
pub trait Transport {
    /// Start delivering reads to the session.
    fn resume_reads(&mut self) -> io::Result<()>;

    /// Stop delivering reads until [`resume_reads`](Transport::resume_reads).
    fn pause_reads(&mut self);

    /// Write `bufs` in order as one vectored write.
    ///
    /// The buffers are reference counted, so a transport that cannot finish
    /// immediately may keep clones until the write completes.
    fn writev(&mut self, bufs: &[Bytes]) -> io::Result<WriteStatus>;

    /// Flush what is queued and close.
    fn close(&mut self);

    /// Close immediately, discarding unwritten data.
    fn close_now(&mut self) {
        self.close();
    }

    /// False once the peer has half-closed or the socket has failed.
    fn good(&self) -> bool;

    fn peer_addr(&self) -> Option<SocketAddr>;
}
