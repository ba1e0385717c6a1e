//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference sane caches/strategies)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<...>>
//! - Runs before the config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GatewayConfig, StrategyKind};

/// One semantic problem found in a configuration.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("'{}' is not a socket address", config.listener.bind_address),
        });
    }

    match Url::parse(&config.upstream.origin) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError {
            field: "upstream.origin".into(),
            message: format!("scheme '{}' is not http or https", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError {
            field: "upstream.origin".into(),
            message: e.to_string(),
        }),
    }

    let mut route_names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", index);

        if route.name.is_empty() {
            errors.push(ValidationError {
                field: format!("{}.name", field),
                message: "route name must not be empty".into(),
            });
        } else if !route_names.insert(route.name.clone()) {
            errors.push(ValidationError {
                field: format!("{}.name", field),
                message: format!("duplicate route name '{}'", route.name),
            });
        }

        if route.host.is_none() && route.path_prefix.is_none() {
            errors.push(ValidationError {
                field: field.clone(),
                message: "route needs a host or a path_prefix to match on".into(),
            });
        }

        if route.network_timeout_secs.is_some() && route.strategy != StrategyKind::NetworkFirst {
            errors.push(ValidationError {
                field: format!("{}.network_timeout_secs", field),
                message: "network timeout only applies to the network-first strategy".into(),
            });
        }

        if route.cache_name.is_empty() {
            errors.push(ValidationError {
                field: format!("{}.cache_name", field),
                message: "cache name must not be empty".into(),
            });
        }
    }

    for (index, cache) in config.storage.caches.iter().enumerate() {
        if cache.capacity_bytes == 0 {
            errors.push(ValidationError {
                field: format!("storage.caches[{}].capacity_bytes", index),
                message: "capacity must be greater than zero".into(),
            });
        }
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError {
            field: "retries.max_attempts".into(),
            message: "must be at least 1 when retries are enabled".into(),
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address".into(),
            message: format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
