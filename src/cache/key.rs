//! Cache Key Module
//!
//! Derives fixed-size lookup keys from a request's path and query.

use std::fmt;

use sha2::{Digest, Sha256};

// == Variant ==
/// Representation of a cached body.
///
/// Folded into the key so a gzip-encoded copy is never served to a
/// client that did not ask for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Identity,
    Gzip,
}

impl Variant {
    /// Picks the variant a request can accept from its `Accept-Encoding` value.
    ///
    /// This is the only place that decides whether a client takes gzip.
    pub fn from_accept_encoding(accept_encoding: Option<&str>) -> Self {
        match accept_encoding {
            Some(value) if value.contains("gzip") => Variant::Gzip,
            _ => Variant::Identity,
        }
    }

    /// `Accept-Encoding` value to send upstream when fetching this variant.
    pub fn upstream_accept_encoding(self) -> Option<&'static str> {
        match self {
            Variant::Identity => None,
            Variant::Gzip => Some("gzip"),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Variant::Identity => "identity",
            Variant::Gzip => "gzip",
        }
    }
}

// == Cache Key ==
/// SHA-256 digest of a request identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derives a key from the path and query exactly as seen on the wire.
    ///
    /// Each call hashes with its own hasher; nothing is shared between calls.
    pub fn derive(path_and_query: &str, variant: Variant) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(path_and_query.as_bytes());
        hasher.update([0u8]);
        hasher.update(variant.as_str().as_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self)
    }
}

// Short hex prefix, enough to tell keys apart in logs.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
