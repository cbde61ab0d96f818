use md5::{Digest, Md5};

use crate::error::Error;
use crate::hash::{HashFunc, md5_point};

/// Points an average-weight node places on the continuum.
const POINTS_PER_NODE: f64 = 160.0;

/// Points cut from one MD5 digest of a node label.
const POINTS_PER_DIGEST: usize = 4;

/// Guards the point share against rounding just below a whole digest.
const SHARE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Point {
    hash: u32,
    node: u32,
}

/// Consistent hashing over a ketama continuum, as libmemcached lays it out.
///
/// Node `i` is labelled `"{identity}-{n}"` for `n` in `0..digests`, and each
/// label's MD5 digest is cut into four little-endian points. A key belongs to
/// the node owning the first point at or after the key's own MD5 point,
/// wrapping to the lowest point.
///
/// Weights are relative. A node holding share `w / total` of the weight gets
/// `floor(w / total * 40 * nodes) * 4` points, so equal weights give each
/// node 160 points and a zero-weight node owns no keys.
///
/// Node indices follow the order given, so a ring built over the identities
/// of a [`HashRoute`](crate::HashRoute)'s children selects those children.
/// The route salts keys before they reach the ring.
#[derive(Debug, Clone)]
pub struct KetamaHash {
    continuum: Box<[Point]>,
    identities: Box<[String]>,
}

impl KetamaHash {
    /// Ring with every node at the same weight.
    pub fn new<S: AsRef<str>>(identities: &[S]) -> Result<Self, Error> {
        Self::weighted(identities.iter().map(|id| (id.as_ref(), 1.0)))
    }

    /// Ring over `(identity, weight)` pairs.
    ///
    /// Weights must be finite and non-negative, and at least one must be
    /// positive.
    pub fn weighted<S, I>(nodes: I) -> Result<Self, Error>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut identities = Vec::new();
        let mut weights = Vec::new();
        for (identity, weight) in nodes {
            let identity = identity.as_ref();
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidWeight(identity.to_owned()));
            }
            identities.push(identity.to_owned());
            weights.push(weight);
        }
        if identities.is_empty() {
            return Err(Error::NoChildren("ketama"));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::NoWeight);
        }

        let digests_per_share = POINTS_PER_NODE / POINTS_PER_DIGEST as f64;
        let count = identities.len() as f64;
        let mut continuum = Vec::new();
        for (node, (identity, weight)) in identities.iter().zip(&weights).enumerate() {
            let digests = (weight / total * digests_per_share * count + SHARE_EPSILON).floor();
            for label in 0..digests as usize {
                let digest = Md5::digest(format!("{identity}-{label}"));
                for chunk in digest.chunks_exact(4) {
                    continuum.push(Point {
                        hash: u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                        node: node as u32,
                    });
                }
            }
        }
        // Ties on a point break by node index so every process agrees.
        continuum.sort_unstable();

        Ok(KetamaHash {
            continuum: continuum.into_boxed_slice(),
            identities: identities.into_boxed_slice(),
        })
    }

    /// Index of the node owning `key`.
    pub fn node_for(&self, key: &[u8]) -> usize {
        let hash = md5_point(key);
        let at = self.continuum.partition_point(|p| p.hash < hash);
        self.continuum
            .get(at)
            .or_else(|| self.continuum.first())
            .map_or(0, |p| p.node as usize)
    }

    pub fn identity(&self, node: usize) -> Option<&str> {
        self.identities.get(node).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.identities.len()
    }

    pub fn point_count(&self) -> usize {
        self.continuum.len()
    }

    /// Points `node` holds on the continuum.
    pub fn points_of(&self, node: usize) -> usize {
        self.continuum
            .iter()
            .filter(|p| p.node as usize == node)
            .count()
    }
}

impl HashFunc for KetamaHash {
    fn hash(&self, key: &[u8]) -> usize {
        self.node_for(key)
    }
}
