//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request gate settings (size limit, origins, protected namespaces).
    pub security: SecurityConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Application the guard forwards admitted requests to.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Largest declared `Content-Length` admitted, in bytes.
    pub max_request_bytes: u64,

    /// Origins allowed to call protected namespaces cross-origin.
    /// Compared verbatim against the `Origin` header.
    pub trusted_origins: Vec<String>,

    /// Path prefixes that require origin validation.
    pub protected_prefixes: Vec<String>,

    /// Derive the client key from `X-Forwarded-For` / `X-Real-IP` when present.
    pub trust_forwarded_headers: bool,

    /// Number of trusted proxies in front of the guard. The client address is
    /// the `X-Forwarded-For` entry this many places from the right.
    pub trusted_proxy_hops: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 5 * 1024 * 1024, // 5MB
            trusted_origins: Vec::new(),
            protected_prefixes: vec!["/api/".to_string()],
            trust_forwarded_headers: true,
            trusted_proxy_hops: 1,
        }
    }
}

impl SecurityConfig {
    /// True if `origin` is in the trusted list.
    pub fn is_trusted_origin(&self, origin: &str) -> bool {
        self.trusted_origins.iter().any(|o| o == origin)
    }

    /// True if `path` falls under a namespace requiring origin validation.
    pub fn is_protected_path(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per client within one window. Zero rejects everything.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Interval between sweeps of expired windows, in seconds (0 = never).
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}

impl RateLimitConfig {
    /// Window length in milliseconds.
    pub fn window_millis(&self) -> u64 {
        self.window_secs.saturating_mul(1000)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000"). When unset, admitted
    /// requests that match no local route get a 404.
    pub address: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
