//! Memcache text protocol reply encoding.

use bytes::{BufMut, Bytes, BytesMut};
use ringline_route::{Operation, Reply, ResultCode};

use crate::write_queue::{EncodeContext, ReplyEncoder, WriteBuffer};

const CRLF: &[u8] = b"\r\n";

/// Encodes replies in the memcache ASCII framing.
///
/// Values are attached as separate parts, so a hit is written without
/// copying its payload. Retrieval misses produce no bytes; the closing `END`
/// comes from the multi-op end reply.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsciiEncoder;

impl ReplyEncoder for AsciiEncoder {
    fn encode(&self, ctx: EncodeContext<'_>, reply: &Reply) -> WriteBuffer {
        let mut wb = WriteBuffer::new();
        let result = reply.result();

        if result.is_error() {
            wb.push(error_line(reply));
            return wb;
        }
        if ctx.end_of_multi_op {
            wb.push(Bytes::from_static(b"END\r\n"));
            return wb;
        }

        match ctx.op {
            op if op.is_get_family() => {
                if result == ResultCode::Found {
                    let key = ctx.key.map(|k| &k[..]).unwrap_or_default();
                    wb.push(value_header(key, reply.flags(), reply.value().len()));
                    wb.push(reply.value().clone());
                    wb.push(Bytes::from_static(CRLF));
                }
            }
            Operation::Version => {
                let mut line = BytesMut::with_capacity(reply.value().len() + 10);
                line.put_slice(b"VERSION ");
                line.put_slice(reply.value());
                line.put_slice(CRLF);
                wb.push(line.freeze());
            }
            // The connection closes without a reply.
            Operation::Quit => {}
            Operation::Incr | Operation::Decr if result != ResultCode::NotFound => {
                wb.push(reply.value().clone());
                wb.push(Bytes::from_static(CRLF));
            }
            _ => wb.push(status_line(result)),
        }
        wb
    }
}

fn status_line(result: ResultCode) -> Bytes {
    let line: &'static [u8] = match result {
        ResultCode::Stored | ResultCode::StaleStored => b"STORED\r\n",
        ResultCode::NotStored => b"NOT_STORED\r\n",
        ResultCode::Exists => b"EXISTS\r\n",
        ResultCode::Deleted => b"DELETED\r\n",
        ResultCode::NotFound => b"NOT_FOUND\r\n",
        ResultCode::Touched => b"TOUCHED\r\n",
        _ => b"OK\r\n",
    };
    Bytes::from_static(line)
}

fn error_line(reply: &Reply) -> Bytes {
    let result = reply.result();
    if result == ResultCode::BadCommand && reply.message().is_none() {
        return Bytes::from_static(b"ERROR\r\n");
    }
    let prefix: &[u8] = if result.is_client_error() {
        b"CLIENT_ERROR "
    } else {
        b"SERVER_ERROR "
    };
    let message = reply.message().unwrap_or(result.as_str());
    let mut line = BytesMut::with_capacity(prefix.len() + message.len() + 2);
    line.put_slice(prefix);
    line.put_slice(message.as_bytes());
    line.put_slice(CRLF);
    line.freeze()
}

fn value_header(key: &[u8], flags: u32, len: usize) -> Bytes {
    let tail = format!(" {flags} {len}\r\n");
    let mut header = BytesMut::with_capacity(6 + key.len() + tail.len());
    header.put_slice(b"VALUE ");
    header.put_slice(key);
    header.put_slice(tail.as_bytes());
    header.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Protocol;

    fn wire(op: Operation, key: Option<&Bytes>, end: bool, reply: Reply) -> Vec<u8> {
        let ctx = EncodeContext {
            protocol: Protocol::Ascii,
            op,
            key,
            end_of_multi_op: end,
        };
        AsciiEncoder
            .encode(ctx, &reply)
            .parts()
            .iter()
            .flat_map(|p| p.iter().copied())
            .collect()
    }

    #[test]
    fn storage_status_lines() {
        let cases = [
            (ResultCode::Stored, "STORED\r\n"),
            (ResultCode::NotStored, "NOT_STORED\r\n"),
            (ResultCode::Exists, "EXISTS\r\n"),
            (ResultCode::NotFound, "NOT_FOUND\r\n"),
        ];
        for (result, expected) in cases {
            assert_eq!(
                wire(Operation::Set, None, false, Reply::new(result)),
                expected.as_bytes()
            );
        }
        assert_eq!(
            wire(Operation::Delete, None, false, Reply::new(ResultCode::Deleted)),
            b"DELETED\r\n"
        );
    }

    #[test]
    fn retrieval_hit_and_miss() {
        let key = Bytes::from_static(b"foo");
        let hit = Reply::found("bar").with_flags(5);
        assert_eq!(
            wire(Operation::Get, Some(&key), false, hit),
            b"VALUE foo 5 3\r\nbar\r\n"
        );
        let miss = Reply::new(ResultCode::NotFound);
        assert!(wire(Operation::Get, Some(&key), false, miss).is_empty());
        assert_eq!(
            wire(Operation::Get, None, true, Reply::new(ResultCode::Ok)),
            b"END\r\n"
        );
    }

    #[test]
    fn errors() {
        let remote = Reply::error(ResultCode::RemoteError, "boom");
        assert_eq!(
            wire(Operation::Get, None, true, remote),
            b"SERVER_ERROR boom\r\n"
        );
        let client = Reply::error(ResultCode::ClientError, "bad data chunk");
        assert_eq!(
            wire(Operation::Unknown, None, false, client),
            b"CLIENT_ERROR bad data chunk\r\n"
        );
        assert_eq!(
            wire(Operation::Unknown, None, false, Reply::new(ResultCode::BadCommand)),
            b"ERROR\r\n"
        );
        assert_eq!(
            wire(Operation::Get, None, false, Reply::new(ResultCode::BadKey)),
            b"CLIENT_ERROR bad_key\r\n"
        );
    }

    #[test]
    fn control_commands() {
        let version = Reply::new(ResultCode::Ok).with_value("1.2.3");
        assert_eq!(
            wire(Operation::Version, None, false, version),
            b"VERSION 1.2.3\r\n"
        );
        assert!(wire(Operation::Quit, None, false, Reply::new(ResultCode::Ok)).is_empty());
        assert_eq!(
            wire(Operation::Shutdown, None, false, Reply::new(ResultCode::Ok)),
            b"OK\r\n"
        );
        let incr = Reply::new(ResultCode::Stored).with_value("42");
        assert_eq!(wire(Operation::Incr, None, false, incr), b"42\r\n");
    }
}
