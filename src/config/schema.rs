//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the caching gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Upstream origin the gateway fronts.
    pub upstream: UpstreamConfig,

    /// Persistent cache storage settings.
    pub storage: StorageConfig,

    /// Route definitions mapping requests to caching strategies.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for upstream fetches.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum buffered request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the origin server (e.g., "http://127.0.0.1:3000").
    pub origin: String,

    /// Maximum buffered response body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:3000".to_string(),
            body_limit_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Persistent cache storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for cache persistence files. Memory-only when unset.
    pub directory: Option<String>,

    /// Default byte capacity applied to caches without their own entry.
    /// Unlimited when unset.
    pub default_capacity_bytes: Option<u64>,

    /// Per-cache capacity overrides.
    pub caches: Vec<CacheTuning>,
}

/// Capacity override for one named cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheTuning {
    /// Cache name as referenced by routes.
    pub name: String,

    /// Byte capacity; writes beyond this fail with a quota error.
    pub capacity_bytes: u64,
}

/// The caching strategy a route applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    NetworkFirst,
    CacheFirst,
    StaleWhileRevalidate,
    NetworkOnly,
    CacheOnly,
}

/// Route configuration mapping requests to a strategy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host to match (exact, case-insensitive).
    pub host: Option<String>,

    /// URL path prefix to match.
    pub path_prefix: Option<String>,

    /// Strategy to apply.
    pub strategy: StrategyKind,

    /// Named cache the strategy reads and writes.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Network-first only: seconds to wait before falling back to cache.
    pub network_timeout_secs: Option<u64>,
}

fn default_cache_name() -> String {
    "runtime".to_string()
}

/// Timeout configuration for various operations.
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

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format (pretty for development, json for production).
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
