//! Response models for the admin endpoints
//!
//! These DTOs are serialized for `/_ouchi/*`; proxied traffic never
//! passes through them.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, StatsResponse};
