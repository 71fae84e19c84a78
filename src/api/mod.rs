//! API Module
//!
//! Request dispatch and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /_ouchi/health` - Health check endpoint
//! - `GET /_ouchi/stats` - Cache statistics
//! - everything else - proxied through the cache

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
