//! Proxy Module
//!
//! Origin forwarding, response interception and compression.

pub mod compression;
mod interceptor;
mod origin;

pub use interceptor::{is_cacheable, ResponseCacheInterceptor};
pub use origin::{is_websocket_upgrade, OriginClient};
