//! API Handlers
//!
//! The caching proxy handler plus the admin health and stats endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        Method,
    },
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};

use crate::cache::{current_timestamp, CacheEntry, CacheKey, CacheStore, Variant};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{HealthResponse, StatsResponse};
use crate::proxy::{is_websocket_upgrade, OriginClient, ResponseCacheInterceptor};

/// Response header reporting whether the cache served the request.
pub const CACHE_STATUS_HEADER: &str = "x-ouchi-cache";

const HIT: &str = "hit";
const MISS: &str = "miss";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared response cache
    pub store: Arc<CacheStore>,
    /// Client for the upstream server
    pub origin: OriginClient,
    /// Writes eligible origin responses into `store`
    pub interceptor: ResponseCacheInterceptor,
    /// Headers stamped on every response, last
    pub static_headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl AppState {
    /// Creates a new AppState around an existing store.
    pub fn new(
        store: Arc<CacheStore>,
        origin: OriginClient,
        ttl_seconds: u64,
        max_body_bytes: usize,
        static_headers: Vec<(HeaderName, HeaderValue)>,
    ) -> Self {
        let interceptor = ResponseCacheInterceptor::new(Arc::clone(&store), ttl_seconds, max_body_bytes);
        Self {
            store,
            origin,
            interceptor,
            static_headers: Arc::new(static_headers),
        }
    }

    /// Creates a new AppState from configuration with an empty cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        let origin = OriginClient::new(&config.proxy_target())?;
        Ok(Self::new(
            Arc::new(CacheStore::new()),
            origin,
            config.ttl_sec,
            config.max_body_bytes,
            config.static_headers()?,
        ))
    }

    fn stamp_static_headers(&self, headers: &mut HeaderMap) {
        for (name, value) in self.static_headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
}

/// Fallback handler for every proxied request.
///
/// Static headers are applied after everything else so neither the cache
/// nor the origin can override them.
pub async fn proxy_handler(State(state): State<AppState>, req: Request) -> Response {
    let mut response = dispatch(&state, req).await;
    state.stamp_static_headers(response.headers_mut());
    response
}

async fn dispatch(state: &AppState, mut req: Request) -> Response {
    // duplex traffic skips the cache entirely
    if is_websocket_upgrade(req.headers()) {
        debug!(uri = %req.uri(), "proxy websocket");
        return state
            .origin
            .tunnel(req)
            .await
            .unwrap_or_else(IntoResponse::into_response);
    }

    if req.method() != Method::GET {
        debug!(method = %req.method(), uri = %req.uri(), "uncached method");
        let response = match state.origin.forward(req).await {
            Ok(response) => response.map(Body::new),
            Err(e) => origin_failure(e),
        };
        return with_cache_status(response, MISS);
    }

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let accept_encoding = req
        .headers()
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let variant = Variant::from_accept_encoding(accept_encoding.as_deref());
    let key = CacheKey::derive(&path_and_query, variant);

    // the origin may only encode the body the way this key's variant allows
    match variant.upstream_accept_encoding() {
        Some(value) => {
            req.headers_mut()
                .insert(header::ACCEPT_ENCODING, HeaderValue::from_static(value));
        }
        None => {
            req.headers_mut().remove(header::ACCEPT_ENCODING);
        }
    }

    match state.store.lookup(&key) {
        Ok(entry) => {
            debug!(
                path = %path_and_query,
                key = %key,
                ttl = entry.ttl_remaining(current_timestamp()),
                "cache hit"
            );
            return with_cache_status(serve_entry(&entry), HIT);
        }
        Err(e) if e.is_miss() => debug!(path = %path_and_query, key = %key, reason = %e, "cache miss"),
        Err(e) => {
            warn!(path = %path_and_query, error = %e, "cache lookup failed");
            return e.into_response();
        }
    }

    let response = match fetch(state, key, accept_encoding.as_deref(), req).await {
        Ok(response) => response,
        Err(e) => origin_failure(e),
    };
    with_cache_status(response, MISS)
}

/// Fetches from the origin and lets the interceptor cache the result.
async fn fetch(
    state: &AppState,
    key: CacheKey,
    accept_encoding: Option<&str>,
    req: Request,
) -> Result<Response> {
    let response = state.origin.forward(req).await?.map(Body::new);
    state.interceptor.intercept(key, accept_encoding, response).await
}

fn origin_failure(e: CacheError) -> Response {
    warn!(error = %e, "request failed");
    e.into_response()
}

/// Replays a cached entry as a complete 200 response.
fn serve_entry(entry: &CacheEntry) -> Response {
    let mut response = Response::new(Body::from(entry.body.clone()));
    let headers = response.headers_mut();

    for (name, value) in [
        (header::CONTENT_TYPE, &entry.content_type),
        (header::CONTENT_ENCODING, &entry.content_encoding),
    ] {
        if value.is_empty() {
            continue;
        }
        // both values were read from valid origin headers
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(name, value);
        }
    }
    response
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static(CACHE_STATUS_HEADER),
        HeaderValue::from_static(status),
    );
    response
}

/// Handler for GET /_ouchi/stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.store.stats()))
}

/// Handler for GET /_ouchi/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.origin.authority().as_str()))
}
