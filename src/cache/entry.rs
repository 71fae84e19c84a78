//! Cache Entry Module
//!
//! Defines the structure for individual cached responses with TTL support.

use bytes::Bytes;
use chrono::Utc;

use super::CacheKey;

// == Cache Entry ==
/// A cached origin response. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Digest this entry is stored under
    pub key: CacheKey,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
    /// Origin `Content-Type`
    pub content_type: String,
    /// Encoding applied to `body`, empty when stored raw
    pub content_encoding: String,
    /// Response body exactly as it will be replayed
    pub body: Bytes,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry expiring `ttl_seconds` after `now`.
    pub fn new(
        key: CacheKey,
        now: i64,
        ttl_seconds: u64,
        content_type: impl Into<String>,
        content_encoding: impl Into<String>,
        body: Bytes,
    ) -> Self {
        Self {
            key,
            expires_at: now.saturating_add(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)),
            content_type: content_type.into(),
            content_encoding: content_encoding.into(),
            body,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Seconds left before expiry at `now`, zero once expired.
    pub fn ttl_remaining(&self, now: i64) -> u64 {
        self.expires_at.saturating_sub(now).max(0) as u64
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
