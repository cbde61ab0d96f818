use bytes::Bytes;
use ringline_route::{Request, ResultCode};

/// Wire framing detected by a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Not yet known; nothing can be written back.
    Unknown,
    /// Memcache text protocol. Replies must follow request order.
    Ascii,
    /// A binary framing with per-request ids.
    Binary,
}

/// Something a decoder found in the byte stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// A complete request.
    ///
    /// `result` carries a verdict the decoder reached on its own, such as
    /// `BadKey`; `ResultCode::Ok` when the request is well formed. `reqid`
    /// is only meaningful for out-of-order framings.
    Request {
        request: Request,
        result: ResultCode,
        reqid: u64,
        noreply: bool,
    },
    /// A request whose body the decoder does not interpret.
    TypedRequest { type_id: u32, body: Bytes, reqid: u64 },
    /// The stream is malformed and cannot continue.
    ParseError { result: ResultCode, reason: String },
    /// End of an ASCII multi-key retrieval line.
    MultiOpEnd,
}

/// Incremental request decoder.
///
/// Decoders report what they found through `events` rather than calling
/// into the session, so the session is never re-entered mid-parse.
pub trait Decoder {
    /// Buffer the transport should read into. Repeated calls return the same
    /// buffer until [`read_data_available`](Decoder::read_data_available).
    fn read_buffer(&mut self) -> &mut [u8];

    /// `len` bytes were written into the last read buffer.
    ///
    /// Returns false if the decoder cannot continue, which closes the
    /// session.
    fn read_data_available(&mut self, len: usize, events: &mut Vec<DecoderEvent>) -> bool;

    fn protocol(&self) -> Protocol;

    /// True when replies may be written in completion order.
    fn out_of_order(&self) -> bool;

    /// Bounds for read buffer sizing.
    fn set_buffer_limits(&mut self, min: usize, max: usize) {
        let _ = (min, max);
    }
}
