//! Session metrics.
//!
//! Process-wide counters for session lifecycle, request admission and the
//! write path.

use metriken::{Counter, Gauge, metric};

// ── Session lifecycle ───────────────────────────────────────────────────

#[metric(
    name = "ringline/session/opened",
    description = "Sessions created"
)]
pub static SESSIONS_OPENED: Counter = Counter::new();

#[metric(
    name = "ringline/session/closed",
    description = "Sessions that reached the closed state"
)]
pub static SESSIONS_CLOSED: Counter = Counter::new();

#[metric(
    name = "ringline/session/active",
    description = "Sessions currently open"
)]
pub static SESSIONS_ACTIVE: Gauge = Gauge::new();

// ── Requests ────────────────────────────────────────────────────────────

#[metric(
    name = "ringline/session/requests",
    description = "Requests accepted from clients"
)]
pub static REQUESTS: Counter = Counter::new();

#[metric(
    name = "ringline/session/parse_errors",
    description = "Connections closed because the request stream was malformed"
)]
pub static PARSE_ERRORS: Counter = Counter::new();

#[metric(
    name = "ringline/session/throttled",
    description = "Times reads were paused because too many requests were in flight"
)]
pub static THROTTLED: Counter = Counter::new();

// ── Write path ──────────────────────────────────────────────────────────

#[metric(
    name = "ringline/session/write_batches",
    description = "Vectored writes issued to transports"
)]
pub static WRITE_BATCHES: Counter = Counter::new();

#[metric(
    name = "ringline/session/write_errors",
    description = "Writes that failed and closed their session"
)]
pub static WRITE_ERRORS: Counter = Counter::new();
