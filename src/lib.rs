//! Ouchi CDN - An edge caching reverse proxy
//!
//! Serves repeated requests from a TTL-bounded in-memory cache and
//! forwards everything else to a single origin.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_sweeper;
