//! Gateway error taxonomy.
//!
//! One enum covers routing, cache and fetch failures so callers can match on
//! the variant that matters to them. Recoverability is a property of the
//! caller, not the error: strategies treat `NetworkFailure` as a fallback
//! trigger, the router treats any handler error as catch-handler input, and
//! `QuotaExceeded` is always terminal for the write that raised it.

use axum::http::Method;
use thiserror::Error;

/// Errors raised by the routing and caching core.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// A route could not be registered or constructed.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    /// Unregistration targeted a route the router does not hold.
    #[error("no registered route with id {route_id} for method {method}")]
    RouteNotFound { method: Method, route_id: u64 },

    /// Only GET requests may be written to a cache.
    #[error("refusing to cache {method} request for '{url}'")]
    NonGetCacheWrite { method: Method, url: String },

    /// A cache write was attempted without a response to store.
    #[error("cannot cache missing response for '{url}'")]
    MissingResponse { url: String },

    /// The persistent store ran out of capacity during a write.
    #[error("storage quota exceeded in cache '{cache_name}' writing '{url}'")]
    QuotaExceeded { cache_name: String, url: String },

    /// The outbound network fetch failed after all attempts.
    #[error("network fetch failed for '{url}': {reason}")]
    NetworkFailure { url: String, reason: String },

    /// A plugin hook produced a value that breaks the hook's contract.
    #[error("plugin '{plugin}' violated the {hook} contract: {detail}")]
    PluginContractViolation {
        plugin: String,
        hook: &'static str,
        detail: String,
    },

    /// A request value could not be constructed (bad URL, bad header).
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The cache storage backend failed outside of quota handling.
    #[error("cache storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// True when a strategy may fall back to its other source.
    pub fn is_recoverable_by_strategy(&self) -> bool {
        matches!(self, GatewayError::NetworkFailure { .. })
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::NonGetCacheWrite {
            method: Method::POST,
            url: "http://origin/api".into(),
        };
        assert_eq!(
            err.to_string(),
            "refusing to cache POST request for 'http://origin/api'"
        );
    }

    #[test]
    fn test_recoverability() {
        let net = GatewayError::NetworkFailure {
            url: "http://origin/a".into(),
            reason: "connection refused".into(),
        };
        assert!(net.is_recoverable_by_strategy());

        let quota = GatewayError::QuotaExceeded {
            cache_name: "runtime".into(),
            url: "http://origin/a".into(),
        };
        assert!(!quota.is_recoverable_by_strategy());
    }
}
