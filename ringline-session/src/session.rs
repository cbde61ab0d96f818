use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::rc::{Rc, Weak};

use bytes::Bytes;
use ringline_route::{Operation, Reply, Request, ResultCode};
use rustls::pki_types::CertificateDer;
use tracing::{debug, error, trace, warn};

use crate::ascii::AsciiEncoder;
use crate::config::SessionConfig;
use crate::context::RequestContext;
use crate::decoder::{Decoder, DecoderEvent, Protocol};
use crate::error::Error;
use crate::flow::{PauseReason, PauseSet};
use crate::handler::{OnRequest, SessionCallbacks};
use crate::metrics;
use crate::multi_op::MultiOp;
use crate::tap::DebugTap;
use crate::tls;
use crate::transport::{Transport, WriteStatus};
use crate::write_queue::{EncodeContext, ReplyEncoder, WriteBuffer, WriteQueue};

/// Session lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Reading and serving requests.
    Streaming,
    /// No longer reading; draining in-flight requests and writes.
    Closing,
    /// Transport released.
    Closed,
}

/// Protocol state of one client connection.
///
/// A session sits between a [`Transport`] and an [`OnRequest`] handler. It
/// decodes incoming bytes, hands each request to the handler together with
/// a [`RequestContext`], and writes the replies back in request order (or
/// completion order, for decoders that tag replies with ids).
///
/// The transport owner drives the session through its entry points:
/// [`with_read_buffer`](Session::with_read_buffer) and
/// [`read_data_available`](Session::read_data_available) for input,
/// [`write_success`](Session::write_success) and
/// [`write_error`](Session::write_error) for writes the transport reported
/// as pending, and [`read_eof`](Session::read_eof),
/// [`read_error`](Session::read_error) or [`close`](Session::close) to shut
/// down. Sessions are reference counted; each entry point holds its own
/// reference, so a session may be released from a callback safely.
pub struct Session {
    this: Weak<Session>,
    inner: RefCell<Inner>,
    transport: RefCell<Box<dyn Transport>>,
    decoder: RefCell<Box<dyn Decoder>>,
    handler: Rc<dyn OnRequest>,
    encoder: Box<dyn ReplyEncoder>,
    callbacks: Rc<dyn SessionCallbacks>,
    tap: Option<Box<dyn DebugTap>>,
    config: SessionConfig,
    peer: Option<SocketAddr>,
}

struct Inner {
    state: State,
    paused: PauseSet,

    // Sequencing for in-order framings.
    head: u64,
    tail: u64,
    blocked: HashMap<u64, WriteBuffer>,

    in_flight: usize,
    real_in_flight: usize,
    multi_op: Option<Rc<MultiOp>>,

    write_queue: Option<WriteQueue>,
    pending_writes: Vec<WriteBuffer>,
    flush_scheduled: bool,
    // The transport failed a write; nothing more goes out.
    write_failed: bool,

    client_common_name: Option<String>,
}

impl Session {
    /// Start building a session over `transport`.
    pub fn builder(
        transport: impl Transport + 'static,
        decoder: impl Decoder + 'static,
        handler: Rc<dyn OnRequest>,
    ) -> SessionBuilder {
        SessionBuilder {
            transport: Box::new(transport),
            decoder: Box::new(decoder),
            handler,
            encoder: Box::new(AsciiEncoder),
            callbacks: Rc::new(()),
            tap: None,
            config: SessionConfig::default(),
        }
    }

    // ── Read path ───────────────────────────────────────────────────────

    /// Lend the decoder's read buffer to `f`, which fills it and returns
    /// how many bytes it wrote.
    ///
    /// `f` must not call back into the session.
    pub fn with_read_buffer<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(self.decoder.borrow_mut().read_buffer())
    }

    /// `len` bytes were read into the buffer last lent out.
    pub fn read_data_available(&self, len: usize) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };

        let mut events = Vec::new();
        let ok = {
            let mut decoder = self.decoder.borrow_mut();
            if let Some(tap) = &self.tap {
                let buf = decoder.read_buffer();
                let data = &buf[..len.min(buf.len())];
                if let Err(e) = tap.on_received(data) {
                    trace!(error = %e, "debug tap failed");
                }
            }
            decoder.read_data_available(len, &mut events)
        };

        for event in events {
            self.on_event(event);
        }
        if !ok {
            debug!(peer = ?self.peer, "decoder cannot continue");
            self.close();
        }
    }

    /// Copy `data` through the read buffer, as a transport would.
    pub fn feed(&self, mut data: &[u8]) {
        while !data.is_empty() {
            let n = self.with_read_buffer(|buf| {
                let n = buf.len().min(data.len());
                buf[..n].copy_from_slice(&data[..n]);
                n
            });
            if n == 0 {
                warn!(peer = ?self.peer, "decoder offered an empty read buffer");
                return;
            }
            self.read_data_available(n);
            data = &data[n..];
        }
    }

    /// The peer closed its side of the connection.
    pub fn read_eof(&self) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };
        debug!(peer = ?self.peer, "peer closed connection");
        self.close();
    }

    /// Reading from the transport failed.
    pub fn read_error(&self, err: io::Error) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };
        debug!(peer = ?self.peer, error = %err, "read failed");
        self.close();
    }

    fn on_event(&self, event: DecoderEvent) {
        if self.state() != State::Streaming {
            return;
        }
        match event {
            DecoderEvent::Request {
                request,
                result,
                reqid,
                noreply,
            } => self.on_request(request, result, reqid, noreply),
            DecoderEvent::TypedRequest {
                type_id,
                body,
                reqid,
            } => {
                // Typed replies carry no ordering, so they cannot share an
                // in-order stream.
                if !self.decoder.borrow().out_of_order() {
                    self.parse_error(
                        ResultCode::ClientError,
                        "typed request on an in-order connection".to_owned(),
                    );
                    return;
                }
                metrics::REQUESTS.increment();
                let ctx = self.new_context(reqid, Operation::Unknown, false, None);
                self.handler.typed_request_ready(type_id, body, ctx);
            }
            DecoderEvent::ParseError { result, reason } => self.parse_error(result, reason),
            DecoderEvent::MultiOpEnd => self.process_multi_op_end(),
        }
    }

    /// Answer a malformed stream with one error reply, then close.
    fn parse_error(&self, result: ResultCode, reason: String) {
        metrics::PARSE_ERRORS.increment();
        debug!(peer = ?self.peer, %result, %reason, "parse error");
        let reqid = self.next_reqid();
        let ctx = self.new_context(reqid, Operation::Unknown, false, None);
        ctx.reply(Reply::error(result, reason));
        self.close();
    }

    fn on_request(&self, request: Request, result: ResultCode, reqid: u64, noreply: bool) {
        metrics::REQUESTS.increment();

        let op = request.op();
        let (protocol, out_of_order) = {
            let decoder = self.decoder.borrow();
            (decoder.protocol(), decoder.out_of_order())
        };

        let mut parent = None;
        let reqid = if out_of_order {
            reqid
        } else {
            if protocol == Protocol::Ascii && op.is_get_family() {
                let group = self.multi_op(op);
                group.add_member();
                parent = Some(group);
            } else {
                self.process_multi_op_end();
            }
            self.next_reqid()
        };

        // A quit is never answered on the wire.
        let noreply = noreply || op == Operation::Quit;
        let mut ctx = self.new_context(reqid, op, noreply, parent);
        if protocol == Protocol::Ascii {
            ctx = ctx.with_key(request.key().clone());
        }

        if result.is_error() {
            ctx.reply(Reply::new(result));
            return;
        }
        match op {
            Operation::Version if self.config.default_version_handler => {
                let version = self.config.version_string.clone();
                ctx.reply(Reply::new(ResultCode::Ok).with_value(version));
            }
            Operation::Quit => {
                ctx.reply(Reply::new(ResultCode::Ok));
                self.close();
            }
            Operation::Shutdown => {
                ctx.reply(Reply::new(ResultCode::Ok));
                self.callbacks.on_shutdown(self);
            }
            _ => self.handler.request_ready(ctx, request),
        }
    }

    fn new_context(
        &self,
        reqid: u64,
        op: Operation,
        noreply: bool,
        parent: Option<Rc<MultiOp>>,
    ) -> RequestContext {
        RequestContext::new(self.rc(), reqid, op, noreply, parent)
    }

    fn next_reqid(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let reqid = inner.tail;
        inner.tail += 1;
        reqid
    }

    /// Active multi-op group, opened on first use.
    fn multi_op(&self, op: Operation) -> Rc<MultiOp> {
        if let Some(group) = self.inner.borrow().multi_op.clone() {
            return group;
        }
        let reqid = self.next_reqid();
        let block = self.new_context(reqid, op, true, None);
        let group = Rc::new(MultiOp::new(op, block));
        self.inner.borrow_mut().multi_op = Some(group.clone());
        group
    }

    fn process_multi_op_end(&self) {
        let Some(group) = self.inner.borrow_mut().multi_op.take() else {
            return;
        };
        let reqid = self.next_reqid();
        let end = self
            .new_context(reqid, group.op(), false, None)
            .end_of_multi_op();
        group.record_end(end);
    }

    // ── Transactions ────────────────────────────────────────────────────

    pub(crate) fn on_transaction_started(&self, sub_request: bool) {
        let throttle = {
            let mut inner = self.inner.borrow_mut();
            inner.in_flight += 1;
            if !sub_request {
                inner.real_in_flight += 1;
            }
            self.config.max_in_flight > 0 && inner.real_in_flight >= self.config.max_in_flight
        };
        if throttle {
            self.pause(PauseReason::Throttled);
        }
    }

    fn on_transaction_completed(&self, sub_request: bool) {
        let unthrottle = {
            let mut inner = self.inner.borrow_mut();
            debug_assert!(inner.in_flight > 0);
            inner.in_flight = inner.in_flight.saturating_sub(1);
            if !sub_request {
                debug_assert!(inner.real_in_flight > 0);
                inner.real_in_flight = inner.real_in_flight.saturating_sub(1);
            }
            self.config.max_in_flight > 0 && inner.real_in_flight < self.config.max_in_flight
        };
        if unthrottle {
            self.resume(PauseReason::Throttled);
        }
        self.check_closed();
    }

    /// Encode and order one reply, then retire its transaction.
    pub(crate) fn reply(&self, ctx: &RequestContext, reply: &Reply) {
        let (protocol, out_of_order) = {
            let decoder = self.decoder.borrow();
            (decoder.protocol(), decoder.out_of_order())
        };

        let wb = if ctx.noreply() {
            WriteBuffer::noreply()
        } else {
            let encode_ctx = EncodeContext {
                protocol,
                op: ctx.op(),
                key: ctx.key(),
                end_of_multi_op: ctx.is_end_of_multi_op(),
            };
            self.encoder.encode(encode_ctx, reply)
        };

        if out_of_order {
            self.queue_write(wb);
        } else {
            let ready = {
                let mut inner = self.inner.borrow_mut();
                if ctx.reqid() == inner.head {
                    let mut ready = vec![wb];
                    inner.head += 1;
                    loop {
                        let head = inner.head;
                        let Some(next) = inner.blocked.remove(&head) else {
                            break;
                        };
                        ready.push(next);
                        inner.head += 1;
                    }
                    ready
                } else {
                    inner.blocked.insert(ctx.reqid(), wb);
                    Vec::new()
                }
            };
            for wb in ready {
                self.queue_write(wb);
            }
        }

        self.on_transaction_completed(ctx.is_multi_op_member());
    }

    // ── Write path ──────────────────────────────────────────────────────

    fn queue_write(&self, wb: WriteBuffer) {
        let dead = {
            let inner = self.inner.borrow();
            inner.state == State::Closed || inner.write_failed
        };
        if dead {
            trace!(peer = ?self.peer, "dropping reply on closed session");
            return;
        }
        if !self.ensure_write_queue() {
            return;
        }

        if self.config.single_write {
            let wire = {
                let mut inner = self.inner.borrow_mut();
                match inner.write_queue.as_mut() {
                    Some(queue) => queue.push_batch(vec![wb]),
                    None => return,
                }
            };
            self.send(wire);
        } else {
            let schedule = {
                let mut inner = self.inner.borrow_mut();
                inner.pending_writes.push(wb);
                !mem::replace(&mut inner.flush_scheduled, true)
            };
            if schedule {
                self.schedule_flush();
            }
        }
    }

    fn ensure_write_queue(&self) -> bool {
        if self.inner.borrow().write_queue.is_some() {
            return true;
        }
        let protocol = self.decoder.borrow().protocol();
        match WriteQueue::new(protocol) {
            Ok(queue) => {
                self.inner.borrow_mut().write_queue = Some(queue);
                true
            }
            Err(e) => {
                error!(peer = ?self.peer, error = %e, "cannot write replies");
                self.transport.borrow_mut().close_now();
                self.close();
                false
            }
        }
    }

    /// Flush pending writes once the tasks already queued this pass ran.
    fn schedule_flush(&self) {
        let this = self.this.clone();
        let spawned = ringline_exec::spawn(async move {
            if let Some(session) = this.upgrade() {
                session.send_writes();
            }
        });
        if spawned.is_err() {
            self.send_writes();
        }
    }

    fn send_writes(&self) {
        let wire = {
            let mut inner = self.inner.borrow_mut();
            inner.flush_scheduled = false;
            let batch = mem::take(&mut inner.pending_writes);
            if batch.is_empty() {
                return;
            }
            match inner.write_queue.as_mut() {
                Some(queue) => queue.push_batch(batch),
                None => return,
            }
        };
        self.send(wire);
    }

    /// Hand one batch to the transport.
    fn send(&self, wire: Vec<Bytes>) {
        if let Some(tap) = &self.tap
            && let Err(e) = tap.on_sent(&wire)
        {
            trace!(error = %e, "debug tap failed");
        }
        metrics::WRITE_BATCHES.increment();

        // A batch of only no-reply buffers still needs its completion.
        let status = if wire.is_empty() {
            Ok(WriteStatus::Complete)
        } else {
            self.transport.borrow_mut().writev(&wire)
        };

        match status {
            Ok(WriteStatus::Complete) => self.write_success(),
            Ok(WriteStatus::Pending) => {
                let backlog = self
                    .inner
                    .borrow()
                    .write_queue
                    .as_ref()
                    .is_some_and(|q| !q.is_empty());
                if self.config.single_write && backlog {
                    self.pause(PauseReason::WriteBackpressure);
                }
            }
            Err(e) => {
                debug!(peer = ?self.peer, error = %e, "write failed");
                self.write_error();
            }
        }
    }

    /// The oldest outstanding write finished.
    pub fn write_success(&self) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };
        let quiescent = {
            let mut inner = self.inner.borrow_mut();
            let streaming = inner.state == State::Streaming;
            match inner.write_queue.as_mut() {
                Some(queue) => {
                    queue.complete_batch();
                    queue.is_empty() && streaming
                }
                None => false,
            }
        };
        if quiescent {
            self.callbacks.on_write_quiescence(self);
            self.resume(PauseReason::WriteBackpressure);
        }
        self.check_closed();
    }

    /// A write failed. The session closes.
    ///
    /// The transport is assumed to report no further completions, so every
    /// outstanding batch is released along with the failed one, and replies
    /// still to come are discarded.
    pub fn write_error(&self) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };
        metrics::WRITE_ERRORS.increment();
        {
            let mut inner = self.inner.borrow_mut();
            inner.write_failed = true;
            inner.pending_writes.clear();
            if let Some(queue) = inner.write_queue.as_mut() {
                let dropped = queue.abandon();
                trace!(peer = ?self.peer, dropped, "abandoning outstanding writes");
            }
        }
        self.close();
    }

    // ── Flow control ────────────────────────────────────────────────────

    fn pause(&self, reason: PauseReason) {
        let added = {
            let mut inner = self.inner.borrow_mut();
            inner.state != State::Closed && inner.paused.insert(reason)
        };
        if added {
            if reason == PauseReason::Throttled {
                metrics::THROTTLED.increment();
            }
            trace!(peer = ?self.peer, ?reason, "pausing reads");
            self.transport.borrow_mut().pause_reads();
        }
    }

    fn resume(&self, reason: PauseReason) {
        let resume = {
            let mut inner = self.inner.borrow_mut();
            inner.paused.remove(reason)
                && inner.paused.is_empty()
                && inner.state == State::Streaming
        };
        if !resume {
            return;
        }
        let mut transport = self.transport.borrow_mut();
        // A half-closed peer gets no more reads.
        if !transport.good() {
            return;
        }
        trace!(peer = ?self.peer, ?reason, "resuming reads");
        if let Err(e) = transport.resume_reads() {
            warn!(peer = ?self.peer, error = %e, "cannot resume reads");
        }
    }

    // ── Close ───────────────────────────────────────────────────────────

    /// Stop reading and close once in-flight requests and writes drain.
    pub fn close(&self) {
        let Some(_guard) = self.this.upgrade() else {
            return;
        };
        if self.state() != State::Closed {
            self.transport.borrow_mut().pause_reads();
        }

        // A group cut short by close still gets its end marker.
        self.process_multi_op_end();

        let started = {
            let mut inner = self.inner.borrow_mut();
            let streaming = inner.state == State::Streaming;
            if streaming {
                inner.state = State::Closing;
            }
            streaming
        };
        if started {
            debug!(peer = ?self.peer, "session closing");
            self.callbacks.on_close_start(self);
        }
        self.check_closed();
    }

    fn check_closed(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            let drained = inner.in_flight == 0
                && inner.pending_writes.is_empty()
                && inner.write_queue.as_ref().is_none_or(WriteQueue::is_empty);
            if inner.state != State::Closing || !drained {
                return;
            }
            inner.state = State::Closed;
            inner.multi_op = None;
            inner.blocked.clear();
        }
        {
            let mut transport = self.transport.borrow_mut();
            transport.pause_reads();
            transport.close();
        }
        metrics::SESSIONS_CLOSED.increment();
        metrics::SESSIONS_ACTIVE.decrement();
        debug!(peer = ?self.peer, "session closed");
        self.callbacks.on_close_finish(self);
    }

    // ── TLS ─────────────────────────────────────────────────────────────

    /// Vet one certificate of the client's chain. See
    /// [`verify_peer_certificate`](crate::tls::verify_peer_certificate).
    pub fn handshake_verify(
        &self,
        depth: u32,
        preverified: bool,
        cert: &CertificateDer<'_>,
    ) -> bool {
        let peer_ip = self.peer.map(|addr| addr.ip());
        let ok = tls::verify_peer_certificate(depth, preverified, cert, peer_ip);
        if !ok {
            debug!(peer = ?self.peer, depth, "rejecting client certificate");
        }
        ok
    }

    /// The handshake completed; remember who the client is.
    pub fn handshake_success(&self, cert: Option<&CertificateDer<'_>>) {
        let name = cert.and_then(tls::common_name);
        debug!(peer = ?self.peer, common_name = ?name, "handshake complete");
        self.inner.borrow_mut().client_common_name = name;
    }

    pub fn handshake_error(&self, err: &io::Error) {
        warn!(peer = ?self.peer, error = %err, "handshake failed");
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Subject common name of the client's TLS certificate.
    pub fn client_common_name(&self) -> Option<String> {
        self.inner.borrow().client_common_name.clone()
    }

    /// Requests (including multi-op members) not yet replied to.
    pub fn in_flight(&self) -> usize {
        self.inner.borrow().in_flight
    }

    pub fn is_paused(&self, reason: PauseReason) -> bool {
        self.inner.borrow().paused.contains(reason)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn rc(&self) -> Rc<Session> {
        // Every caller runs under an entry point's strong reference.
        match self.this.upgrade() {
            Some(rc) => rc,
            None => unreachable!("session used after release"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Released by its owner without reaching Closed.
        if self.inner.get_mut().state != State::Closed {
            self.transport.get_mut().close();
            metrics::SESSIONS_ACTIVE.decrement();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("state", &inner.state)
            .field("in_flight", &inner.in_flight)
            .field("paused", &inner.paused)
            .finish()
    }
}

/// Builder for [`Session`], returned by [`Session::builder`].
pub struct SessionBuilder {
    transport: Box<dyn Transport>,
    decoder: Box<dyn Decoder>,
    handler: Rc<dyn OnRequest>,
    encoder: Box<dyn ReplyEncoder>,
    callbacks: Rc<dyn SessionCallbacks>,
    tap: Option<Box<dyn DebugTap>>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Reply encoder. Defaults to [`AsciiEncoder`].
    pub fn encoder(mut self, encoder: impl ReplyEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn callbacks(mut self, callbacks: Rc<dyn SessionCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Mirror traffic to `tap`.
    pub fn tap(mut self, tap: impl DebugTap + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    /// Create the session and start reading.
    pub fn create(self) -> Result<Rc<Session>, Error> {
        self.config.validate()?;

        let SessionBuilder {
            mut transport,
            mut decoder,
            handler,
            encoder,
            callbacks,
            tap,
            config,
        } = self;
        decoder.set_buffer_limits(config.min_buffer_size, config.max_buffer_size);
        transport.resume_reads().map_err(Error::ReadCallback)?;
        let peer = transport.peer_addr();

        let session = Rc::new_cyclic(|this| Session {
            this: this.clone(),
            inner: RefCell::new(Inner {
                state: State::Streaming,
                paused: PauseSet::default(),
                head: 0,
                tail: 0,
                blocked: HashMap::new(),
                in_flight: 0,
                real_in_flight: 0,
                multi_op: None,
                write_queue: None,
                pending_writes: Vec::new(),
                flush_scheduled: false,
                write_failed: false,
                client_common_name: None,
            }),
            transport: RefCell::new(transport),
            decoder: RefCell::new(decoder),
            handler,
            encoder,
            callbacks,
            tap,
            config,
            peer,
        });

        metrics::SESSIONS_OPENED.increment();
        metrics::SESSIONS_ACTIVE.increment();
        debug!(peer = ?peer, "session created");
        Ok(session)
    }
}
