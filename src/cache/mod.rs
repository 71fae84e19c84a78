//! Cache Module
//!
//! Provides the in-memory response cache with TTL expiration.

mod entry;
mod expiry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp, CacheEntry};
pub use expiry::ExpirationIndex;
pub use key::{CacheKey, Variant};
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;
