//! Response Cache Interceptor
//!
//! Inspects each origin response on its way to the client and writes
//! eligible ones into the cache.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Response, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::cache::{current_timestamp, CacheEntry, CacheKey, CacheStore, Variant};
use crate::error::{CacheError, Result};
use crate::proxy::compression;

/// Returns true if the origin response may be cached.
///
/// Only a 200 whose `Cache-Control` is not exactly `no-cache` or
/// `no-store` qualifies; other directives are not interpreted.
pub fn is_cacheable(status: StatusCode, headers: &HeaderMap) -> bool {
    if status != StatusCode::OK {
        return false;
    }
    !matches!(
        headers.get(header::CACHE_CONTROL).map(HeaderValue::as_bytes),
        Some(b"no-cache") | Some(b"no-store")
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Result of reading an origin body under the size limit.
enum Buffered {
    Complete(Bytes),
    /// Limit exceeded: the bytes read so far followed by the unread rest.
    Overflow(Body),
}

async fn buffer_body(body: Body, limit: usize) -> Result<Buffered> {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| CacheError::Body(e.to_string()))?;
        buf.extend_from_slice(&chunk);
        if buf.len() > limit {
            let head = stream::once(async move { Ok::<_, axum::Error>(buf.freeze()) });
            return Ok(Buffered::Overflow(Body::from_stream(head.chain(stream))));
        }
    }
    Ok(Buffered::Complete(buf.freeze()))
}

// == Interceptor ==
#[derive(Debug, Clone)]
pub struct ResponseCacheInterceptor {
    store: Arc<CacheStore>,
    ttl_seconds: u64,
    max_body_bytes: usize,
}

impl ResponseCacheInterceptor {
    pub fn new(store: Arc<CacheStore>, ttl_seconds: u64, max_body_bytes: usize) -> Self {
        Self {
            store,
            ttl_seconds,
            max_body_bytes,
        }
    }

    // == Intercept ==
    /// Caches `response` under `key` if it is eligible and returns the
    /// response the client should receive.
    ///
    /// Compression uses the accepted encodings of the request that caused
    /// the fetch. An origin body that is already gzip-encoded is stored
    /// as-is; any other origin encoding is passed through uncached, since
    /// the key cannot tell which clients could decode it. Bodies over the
    /// size limit are streamed through uncached.
    pub async fn intercept(
        &self,
        key: CacheKey,
        accept_encoding: Option<&str>,
        response: Response<Body>,
    ) -> Result<Response<Body>> {
        if !is_cacheable(response.status(), response.headers()) {
            debug!(key = %key, status = %response.status(), "not cacheable");
            return Ok(response);
        }

        let variant = Variant::from_accept_encoding(accept_encoding);
        let origin_encoding = match header_str(response.headers(), header::CONTENT_ENCODING) {
            e if e.eq_ignore_ascii_case("identity") => String::new(),
            e => e.to_ascii_lowercase(),
        };
        if !origin_encoding.is_empty()
            && !(origin_encoding == compression::GZIP && variant == Variant::Gzip)
        {
            debug!(key = %key, encoding = %origin_encoding, "origin encoding not cacheable");
            return Ok(response);
        }

        let declared_len = header_str(response.headers(), header::CONTENT_LENGTH)
            .parse::<usize>()
            .ok();
        if declared_len.is_some_and(|len| len > self.max_body_bytes) {
            debug!(key = %key, "body over cache limit");
            return Ok(response);
        }

        let (mut parts, body) = response.into_parts();
        let raw = match buffer_body(body, self.max_body_bytes).await? {
            Buffered::Complete(raw) => raw,
            Buffered::Overflow(body) => {
                debug!(key = %key, "body over cache limit");
                return Ok(Response::from_parts(parts, body));
            }
        };

        let content_type = header_str(&parts.headers, header::CONTENT_TYPE).to_string();

        let (body, encoding) = if origin_encoding.is_empty() {
            let (body, applied) = compression::compress(accept_encoding, &content_type, raw)?;
            (body, applied.to_string())
        } else {
            (raw, origin_encoding)
        };

        let entry = CacheEntry::new(
            key,
            current_timestamp(),
            self.ttl_seconds,
            content_type,
            encoding.clone(),
            body.clone(),
        );
        self.store.put(entry)?;

        if !encoding.is_empty() {
            let value =
                HeaderValue::from_str(&encoding).map_err(|e| CacheError::Internal(e.to_string()))?;
            parts.headers.insert(header::CONTENT_ENCODING, value);
        }
        parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        Ok(Response::from_parts(parts, Body::from(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    const BODY: &str = r#"{"greeting":"hello, edge cache!!!"}"#;

    fn interceptor() -> (Arc<CacheStore>, ResponseCacheInterceptor) {
        let store = Arc::new(CacheStore::new());
        let interceptor = ResponseCacheInterceptor::new(Arc::clone(&store), 60, 1024 * 1024);
        (store, interceptor)
    }

    fn origin_response(status: StatusCode, cache_control: Option<&str>) -> Response<Body> {
        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, BODY.len());
        if let Some(value) = cache_control {
            builder = builder.header(header::CACHE_CONTROL, value);
        }
        builder.body(Body::from(BODY)).unwrap()
    }

    async fn read_body(response: Response<Body>) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[test]
    fn test_is_cacheable() {
        let mut headers = HeaderMap::new();
        assert!(is_cacheable(StatusCode::OK, &headers));
        assert!(!is_cacheable(StatusCode::NOT_FOUND, &headers));
        assert!(!is_cacheable(StatusCode::CREATED, &headers));

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert!(!is_cacheable(StatusCode::OK, &headers));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert!(!is_cacheable(StatusCode::OK, &headers));

        // only the exact values suppress caching
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, private"));
        assert!(is_cacheable(StatusCode::OK, &headers));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        assert!(is_cacheable(StatusCode::OK, &headers));
    }

    #[tokio::test]
    async fn test_caches_eligible_response_uncompressed() {
        let (store, interceptor) = interceptor();
        let key = CacheKey::derive("/a.json", Variant::Identity);

        let response = interceptor
            .intercept(key, None, origin_response(StatusCode::OK, None))
            .await
            .unwrap();

        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(read_body(response).await, BODY.as_bytes());

        let entry = store.lookup(&key).unwrap();
        assert_eq!(&entry.body[..], BODY.as_bytes());
        assert_eq!(entry.content_type, "application/json");
        assert_eq!(entry.content_encoding, "");
    }

    #[tokio::test]
    async fn test_caches_and_serves_gzip() {
        let (store, interceptor) = interceptor();
        let key = CacheKey::derive("/a.json", Variant::Gzip);

        let response = interceptor
            .intercept(key, Some("gzip, br"), origin_response(StatusCode::OK, None))
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        let sent = read_body(response).await;

        let mut decoded = String::new();
        GzDecoder::new(&sent[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, BODY);

        let entry = store.lookup(&key).unwrap();
        assert_eq!(entry.content_encoding, "gzip");
        assert_eq!(entry.body, sent);
    }

    #[tokio::test]
    async fn test_skips_ineligible_responses() {
        let (store, interceptor) = interceptor();
        let key = CacheKey::derive("/a.json", Variant::Identity);

        for response in [
            origin_response(StatusCode::NOT_FOUND, None),
            origin_response(StatusCode::OK, Some("no-store")),
            origin_response(StatusCode::OK, Some("no-cache")),
        ] {
            let passed = interceptor.intercept(key, None, response).await.unwrap();
            assert_eq!(read_body(passed).await, BODY.as_bytes());
        }

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keeps_origin_gzip_for_gzip_clients() {
        let (store, interceptor) = interceptor();
        let key = CacheKey::derive("/pre.txt", Variant::Gzip);
        let response = Response::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::CONTENT_ENCODING, "gzip")
            .body(Body::from(&b"already-encoded"[..]))
            .unwrap();

        let response = interceptor.intercept(key, Some("gzip"), response).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(read_body(response).await, &b"already-encoded"[..]);

        let entry = store.lookup(&key).unwrap();
        assert_eq!(entry.content_encoding, "gzip");
        assert_eq!(&entry.body[..], b"already-encoded");
    }

    #[tokio::test]
    async fn test_other_origin_encodings_pass_through_uncached() {
        let (store, interceptor) = interceptor();

        for (variant, accept) in [(Variant::Gzip, Some("gzip, br")), (Variant::Identity, Some("br"))] {
            let key = CacheKey::derive("/enc.txt", variant);
            let response = Response::builder()
                .header(header::CONTENT_TYPE, "text/plain")
                .header(header::CONTENT_ENCODING, "br")
                .body(Body::from(&b"BROTLI-BYTES"[..]))
                .unwrap();

            let response = interceptor.intercept(key, accept, response).await.unwrap();
            assert_eq!(response.headers()[header::CONTENT_ENCODING], "br");
            assert_eq!(read_body(response).await, &b"BROTLI-BYTES"[..]);
        }

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_body_passes_through_uncached() {
        let store = Arc::new(CacheStore::new());
        let interceptor = ResponseCacheInterceptor::new(Arc::clone(&store), 60, 8);
        let key = CacheKey::derive("/big", Variant::Identity);

        let response = interceptor
            .intercept(key, None, origin_response(StatusCode::OK, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, BODY.as_bytes());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_stream_without_length_keeps_every_byte() {
        let store = Arc::new(CacheStore::new());
        let interceptor = ResponseCacheInterceptor::new(Arc::clone(&store), 60, 10);
        let key = CacheKey::derive("/stream", Variant::Identity);

        let chunks: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"0123456")),
            Ok(Bytes::from_static(b"789abcdef")),
            Ok(Bytes::from_static(b"ghij")),
        ];
        let response = Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        let response = interceptor.intercept(key, None, response).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, &b"0123456789abcdefghij"[..]);
        assert!(store.is_empty());
    }
}
