//! API Routes
//!
//! Configures the Axum router: admin endpoints under `/_ouchi`, every
//! other path proxied through the cache.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_ouchi/health` - Health check endpoint
/// - `GET /_ouchi/stats` - Cache statistics
/// - anything else - served from cache or proxied to the origin
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_ouchi/health", get(health_handler))
        .route("/_ouchi/stats", get(stats_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
