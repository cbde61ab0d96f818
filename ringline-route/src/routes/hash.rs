use bytes::{BufMut, BytesMut};

use crate::error::Error;
use crate::handle::{RouteFuture, RouteHandle, RouteHandlePtr, Traverser};
use crate::hash::HashFunc;
use crate::request::Request;

/// Sends each request to exactly one child chosen by hashing its key.
///
/// The child index is `hash(key ++ salt) % children.len()`. An empty salt
/// hashes the bare key. Selection is a pure function of the key, so every
/// connection agrees on the owner of a key.
pub struct HashRoute<H> {
    children: Vec<RouteHandlePtr>,
    salt: Vec<u8>,
    hash: H,
}

impl<H: HashFunc> HashRoute<H> {
    pub fn new(
        children: Vec<RouteHandlePtr>,
        salt: impl Into<Vec<u8>>,
        hash: H,
    ) -> Result<Self, Error> {
        if children.is_empty() {
            return Err(Error::NoChildren("hash"));
        }
        Ok(HashRoute {
            children,
            salt: salt.into(),
            hash,
        })
    }

    /// Index of the child that owns `key`.
    pub fn pick(&self, key: &[u8]) -> usize {
        let hashed = if self.salt.is_empty() {
            self.hash.hash(key)
        } else {
            let mut salted = BytesMut::with_capacity(key.len() + self.salt.len());
            salted.put_slice(key);
            salted.put_slice(&self.salt);
            self.hash.hash(&salted)
        };
        hashed % self.children.len()
    }

    pub fn children(&self) -> &[RouteHandlePtr] {
        &self.children
    }
}

impl<H: HashFunc> RouteHandle for HashRoute<H> {
    fn name(&self) -> &str {
        "hash"
    }

    fn route(&self, req: Request) -> RouteFuture<'_> {
        let child = &self.children[self.pick(req.key())];
        child.route(req)
    }

    fn traverse(&self, req: &Request, t: &mut Traverser<'_>) {
        t.visit(&self.children[self.pick(req.key())], req);
    }
}
