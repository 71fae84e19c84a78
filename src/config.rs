//! Configuration Module
//!
//! Loads the proxy configuration from a JSON file, with environment
//! variable overrides for the numeric settings.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Proxy configuration parameters.
///
/// Every field has a default, so a partial JSON file is accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port of the origin server on localhost
    pub origin_port: u16,
    /// Port the proxy listens on
    pub listen_port: u16,
    /// Time-to-live of cached entries in seconds
    pub ttl_sec: u64,
    /// Interval between expiration sweeps in seconds
    pub tick_sec: u64,
    /// Static headers stamped on every response
    pub headers: HashMap<String, String>,
    /// Explicit proxy target; defaults to `http://localhost:{origin_port}`
    pub proxy_url: Option<String>,
    /// Largest origin body that will be buffered for caching
    pub max_body_bytes: usize,
}

impl Config {
    /// Reads and validates a JSON configuration file, then applies
    /// environment overrides.
    ///
    /// # Environment Variables
    /// - `OUCHI_LISTEN_PORT` - proxy listen port
    /// - `OUCHI_ORIGIN_PORT` - origin port on localhost
    /// - `OUCHI_TTL_SEC` - cache TTL in seconds
    /// - `OUCHI_TICK_SEC` - sweep interval in seconds
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = Self::from_json(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses a configuration document.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Some(port) = env_parse("OUCHI_LISTEN_PORT") {
            self.listen_port = port;
        }
        if let Some(port) = env_parse("OUCHI_ORIGIN_PORT") {
            self.origin_port = port;
        }
        if let Some(ttl) = env_parse("OUCHI_TTL_SEC") {
            self.ttl_sec = ttl;
        }
        if let Some(tick) = env_parse("OUCHI_TICK_SEC") {
            self.tick_sec = tick;
        }
    }

    /// Rejects zero durations and headers that cannot be sent on the wire.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_sec == 0 {
            return Err(CacheError::Config("ttl_sec must be positive".to_string()));
        }
        if self.tick_sec == 0 {
            return Err(CacheError::Config("tick_sec must be positive".to_string()));
        }
        self.static_headers().map(|_| ())
    }

    /// Base URL requests are forwarded to.
    pub fn proxy_target(&self) -> String {
        self.proxy_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.origin_port))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_sec)
    }

    /// Converts the configured header map into typed header pairs.
    pub fn static_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| CacheError::Config(format!("header name {:?}: {}", name, e)))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| CacheError::Config(format!("header {}: {}", name, e)))?;
                Ok((name, value))
            })
            .collect()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin_port: 8080,
            listen_port: 3000,
            ttl_sec: 60,
            tick_sec: 1,
            headers: HashMap::new(),
            proxy_url: None,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}
