//! Key hashing for [`HashRoute`](crate::HashRoute).

mod ketama;

pub use ketama::KetamaHash;

use md5::{Digest, Md5};

/// Maps a key to a bucket hint.
///
/// The hash route reduces the result modulo its child count, so an
/// implementation may return any `usize`.
pub trait HashFunc: Send + Sync {
    fn hash(&self, key: &[u8]) -> usize;
}

impl<F> HashFunc for F
where
    F: Fn(&[u8]) -> usize + Send + Sync,
{
    fn hash(&self, key: &[u8]) -> usize {
        self(key)
    }
}

/// First four bytes of the key's MD5 digest, little-endian.
///
/// This is the same point function ketama uses, applied directly as a
/// modulo hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hash;

impl HashFunc for Md5Hash {
    fn hash(&self, key: &[u8]) -> usize {
        md5_point(key) as usize
    }
}

pub(crate) fn md5_point(data: &[u8]) -> u32 {
    let digest = Md5::digest(data);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}
