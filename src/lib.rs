//! Caching Gateway Library
//!
//! An HTTP gateway that intercepts inbound requests and arbitrates, per
//! request, between a persistent cache and the upstream network, with an
//! ordered plugin-hook pipeline around every step of that decision.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod plugins;
pub mod resilience;
pub mod routing;
pub mod strategy;

pub use config::schema::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
