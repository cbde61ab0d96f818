use std::io;

use thiserror::Error;

use crate::decoder::Protocol;

/// Errors returned by the session layer.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport refused to start delivering reads.
    #[error("failed to enable reads: {0}")]
    ReadCallback(#[source] io::Error),
    /// A write queue was requested for a protocol with no reply framing.
    #[error("unsupported protocol: {0:?}")]
    UnsupportedProtocol(Protocol),
    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Invalid session configuration.
    #[error("invalid config: {0}")]
    Config(String),
}
