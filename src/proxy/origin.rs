//! Origin Client
//!
//! Forwards requests to the single upstream server, including websocket
//! upgrades which are tunnelled rather than buffered.

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, StatusCode, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tracing::{debug, warn};

use crate::error::{CacheError, Result};

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Returns true when the request asks to switch to the websocket protocol.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

// == Origin Client ==
/// HTTP/1.1 client bound to one origin.
#[derive(Clone)]
pub struct OriginClient {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
    host: HeaderValue,
}

impl OriginClient {
    // == Constructor ==
    /// Creates a client for a target such as `http://localhost:8080`.
    pub fn new(target: &str) -> Result<Self> {
        let uri: Uri = target
            .parse()
            .map_err(|e| CacheError::Config(format!("proxy target {:?}: {}", target, e)))?;

        let scheme = uri.scheme().cloned().unwrap_or(Scheme::HTTP);
        if scheme != Scheme::HTTP {
            return Err(CacheError::Config(format!(
                "proxy target {:?}: only http origins are supported",
                target
            )));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| CacheError::Config(format!("proxy target {:?} has no host", target)))?;
        let host = HeaderValue::from_str(authority.as_str())
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            scheme,
            authority,
            host,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Points the request at the origin and sets its `Host`.
    fn retarget(&self, req: &mut Request<Body>) -> Result<()> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| CacheError::Origin(e.to_string()))?;

        *req.uri_mut() = uri;
        req.headers_mut().insert(header::HOST, self.host.clone());
        Ok(())
    }

    async fn send(&self, req: Request<Body>) -> Result<Response<Incoming>> {
        self.client
            .request(req)
            .await
            .map_err(|e| CacheError::Origin(e.to_string()))
    }

    // == Forward ==
    /// Sends an ordinary request to the origin.
    pub async fn forward(&self, mut req: Request<Body>) -> Result<Response<Incoming>> {
        self.retarget(&mut req)?;
        for name in HOP_BY_HOP {
            req.headers_mut().remove(name);
        }

        let mut res = self.send(req).await?;
        for name in HOP_BY_HOP {
            res.headers_mut().remove(name);
        }
        Ok(res)
    }

    // == Tunnel ==
    /// Forwards an upgrade request and, if the origin switches protocols,
    /// joins the two upgraded connections.
    ///
    /// Nothing is buffered; bytes flow in both directions until either side
    /// closes.
    pub async fn tunnel(&self, mut req: Request<Body>) -> Result<Response<Body>> {
        let client_upgrade = hyper::upgrade::on(&mut req);
        self.retarget(&mut req)?;

        let mut res = self.send(req).await?;
        if res.status() != StatusCode::SWITCHING_PROTOCOLS {
            debug!(status = %res.status(), "origin declined upgrade");
            return Ok(res.map(Body::new));
        }

        let origin_upgrade = hyper::upgrade::on(&mut res);
        tokio::spawn(async move {
            let (client_io, origin_io) = match tokio::try_join!(client_upgrade, origin_upgrade) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "websocket upgrade failed");
                    return;
                }
            };

            let mut client_io = TokioIo::new(client_io);
            let mut origin_io = TokioIo::new(origin_io);
            match tokio::io::copy_bidirectional(&mut client_io, &mut origin_io).await {
                Ok((sent, received)) => debug!(sent, received, "websocket closed"),
                Err(e) => debug!(error = %e, "websocket tunnel ended"),
            }
        });

        let (parts, _) = res.into_parts();
        Ok(Response::from_parts(parts, Body::empty()))
    }
}
