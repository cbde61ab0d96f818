use std::io;

use bytes::Bytes;

/// Mirror of a session's traffic, for debugging.
///
/// Failures are logged at `trace` and otherwise ignored; a tap can never
/// affect the session it observes.
pub trait DebugTap {
    /// Bytes read from the client, before decoding.
    fn on_received(&self, data: &[u8]) -> io::Result<()>;

    /// Parts of one vectored write to the client.
    fn on_sent(&self, parts: &[Bytes]) -> io::Result<()>;
}
