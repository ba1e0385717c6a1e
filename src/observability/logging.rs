//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem
//! - Select output format (pretty for development, JSON for production)
//! - Respect `RUST_LOG` overrides
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Format chosen by config, level by env filter with a sane default
//! - Call init once from main; a second init panics

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Initialize the global tracing subscriber.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "caching_gateway=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
