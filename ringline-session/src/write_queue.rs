use std::collections::VecDeque;

use bytes::Bytes;
use ringline_route::{Operation, Reply};

use crate::decoder::Protocol;
use crate::error::Error;

/// One encoded reply.
///
/// A no-reply buffer occupies a slot in the write queue, so completions stay
/// aligned, but contributes no bytes to the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBuffer {
    parts: Vec<Bytes>,
    noreply: bool,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for a reply the client asked not to receive.
    pub fn noreply() -> Self {
        WriteBuffer {
            parts: Vec::new(),
            noreply: true,
        }
    }

    pub fn push(&mut self, part: impl Into<Bytes>) {
        let part = part.into();
        if !part.is_empty() {
            self.parts.push(part);
        }
    }

    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    pub fn is_noreply(&self) -> bool {
        self.noreply
    }

    /// Total bytes this buffer puts on the wire.
    pub fn len(&self) -> usize {
        self.parts.iter().map(Bytes::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// What an encoder knows about the request being answered.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    pub protocol: Protocol,
    pub op: Operation,
    /// Request key, retained for the ASCII framing.
    pub key: Option<&'a Bytes>,
    /// This reply terminates a multi-key retrieval.
    pub end_of_multi_op: bool,
}

/// Turns replies into wire bytes.
pub trait ReplyEncoder {
    fn encode(&self, ctx: EncodeContext<'_>, reply: &Reply) -> WriteBuffer;
}

/// Buffers handed to the transport and not yet acknowledged.
///
/// Buffers are pushed in batches, one batch per vectored write, and a
/// completion retires exactly one batch.
#[derive(Debug)]
pub struct WriteQueue {
    protocol: Protocol,
    buffers: VecDeque<WriteBuffer>,
    batches: VecDeque<usize>,
}

impl WriteQueue {
    pub fn new(protocol: Protocol) -> Result<Self, Error> {
        if protocol == Protocol::Unknown {
            return Err(Error::UnsupportedProtocol(protocol));
        }
        Ok(WriteQueue {
            protocol,
            buffers: VecDeque::new(),
            batches: VecDeque::new(),
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Record a vectored write of `batch` and return the wire parts to send.
    pub fn push_batch(&mut self, batch: Vec<WriteBuffer>) -> Vec<Bytes> {
        let wire = batch
            .iter()
            .filter(|wb| !wb.is_noreply())
            .flat_map(|wb| wb.parts().iter().cloned())
            .collect();
        self.batches.push_back(batch.len());
        self.buffers.extend(batch);
        wire
    }

    /// Retire the oldest batch. Returns how many buffers were released.
    pub fn complete_batch(&mut self) -> usize {
        let Some(count) = self.batches.pop_front() else {
            return 0;
        };
        let count = count.min(self.buffers.len());
        self.buffers.drain(..count);
        count
    }

    /// Drop every outstanding batch. Returns how many buffers were released.
    ///
    /// Used once the transport failed and no further completions will arrive.
    pub fn abandon(&mut self) -> usize {
        self.batches.clear();
        let count = self.buffers.len();
        self.buffers.clear();
        count
    }

    /// Buffers still waiting for acknowledgement.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Writes issued but not yet completed.
    pub fn outstanding_batches(&self) -> usize {
        self.batches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(text: &'static str) -> WriteBuffer {
        let mut wb = WriteBuffer::new();
        wb.push(text);
        wb
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        assert!(matches!(
            WriteQueue::new(Protocol::Unknown),
            Err(Error::UnsupportedProtocol(Protocol::Unknown))
        ));
    }

    #[test]
    fn batches_retire_in_order() {
        let mut queue = WriteQueue::new(Protocol::Ascii).unwrap();
        let wire = queue.push_batch(vec![
            buffer("A\r\n"),
            WriteBuffer::noreply(),
            buffer("B\r\n"),
        ]);
        assert_eq!(
            wire,
            [Bytes::from_static(b"A\r\n"), Bytes::from_static(b"B\r\n")]
        );
        queue.push_batch(vec![buffer("C\r\n")]);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.outstanding_batches(), 2);

        assert_eq!(queue.complete_batch(), 3);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.complete_batch(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.complete_batch(), 0);
    }

    #[test]
    fn abandon_releases_every_batch() {
        let mut queue = WriteQueue::new(Protocol::Ascii).unwrap();
        queue.push_batch(vec![buffer("A\r\n"), buffer("B\r\n")]);
        queue.push_batch(vec![WriteBuffer::noreply()]);
        queue.push_batch(vec![buffer("C\r\n")]);

        assert_eq!(queue.abandon(), 4);
        assert!(queue.is_empty());
        assert_eq!(queue.outstanding_batches(), 0);
        assert_eq!(queue.complete_batch(), 0);
    }

    #[test]
    fn empty_parts_are_skipped() {
        let mut wb = WriteBuffer::new();
        wb.push(Bytes::new());
        wb.push("x");
        assert_eq!(wb.parts().len(), 1);
        assert_eq!(wb.len(), 1);
    }
}
