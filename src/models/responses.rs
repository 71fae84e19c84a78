//! Response DTOs for the admin endpoints
//!
//! Defines the structure of outgoing JSON bodies served under `/_ouchi`.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /_ouchi/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses, expired entries included
    pub misses: u64,
    /// Misses caused by an expired entry
    pub expired_misses: u64,
    /// Origin responses stored
    pub stores: u64,
    /// Entries removed by the sweeper
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired_misses: stats.expired_misses,
            stores: stats.stores,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /_ouchi/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Origin the proxy forwards to
    pub origin: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(origin: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            origin: origin.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
