//! Per-connection memcache session pipeline.
//!
//! A [`Session`] owns one client connection. It pulls bytes through a
//! [`Decoder`], hands each request with its [`RequestContext`] to an
//! [`OnRequest`] handler, and writes replies back through a [`Transport`]:
//!
//! - replies leave in request order for in-order framings, even when
//!   handlers finish out of order;
//! - ASCII multi-key retrievals are grouped so their `END` marker follows the
//!   last value, or is replaced by the first member error;
//! - replies finished in one executor pass are coalesced into a single
//!   vectored write, unless [`SessionConfig::single_write`] is set;
//! - reads pause while too many requests are in flight or, in single-write
//!   mode, while the transport is backed up.
//!
//! The session never touches a socket. Whoever owns the socket drives it
//! through the session's entry points and reports write completions back.
//! [`RouteRequestHandler`] connects a session to a `ringline_route` tree.

// ── Internal modules ────────────────────────────────────────────────────
pub(crate) mod ascii;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod decoder;
pub(crate) mod error;
pub(crate) mod flow;
pub(crate) mod handler;
pub(crate) mod metrics;
pub(crate) mod multi_op;
pub(crate) mod session;
pub(crate) mod tap;
pub mod tls;
pub(crate) mod transport;
pub(crate) mod write_queue;

// ── Public API ──────────────────────────────────────────────────────────

/// ASCII reply encoding.
pub use ascii::AsciiEncoder;
/// Session configuration.
pub use config::{SessionConfig, SessionConfigBuilder};
/// Per-request reply handle.
pub use context::RequestContext;
/// Request decoding.
pub use decoder::{Decoder, DecoderEvent, Protocol};
/// Session errors.
pub use error::Error;
/// Read flow control.
pub use flow::{PauseReason, PauseSet};
/// Request handlers and lifecycle hooks.
pub use handler::{OnRequest, RouteRequestHandler, SessionCallbacks};
/// The session itself.
pub use session::{Session, SessionBuilder, State};
/// Traffic mirroring.
pub use tap::DebugTap;
/// The byte stream below a session.
pub use transport::{Transport, WriteStatus};
/// Reply encoding and write accounting.
pub use write_queue::{EncodeContext, ReplyEncoder, WriteBuffer, WriteQueue};
