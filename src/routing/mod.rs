//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, URL)
//!     → router.rs (walk the method's route sequence in order)
//!     → matcher.rs (evaluate match conditions, produce params)
//!     → route.rs (winning route's handler runs)
//!     → Return: response, or no-response for passthrough
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, effectively immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod matcher;
pub mod route;
pub mod router;

pub use matcher::{AndMatcher, HostMatcher, MatchParams, PathPrefixMatcher, RouteMatcher};
pub use route::{handler_fn, Handler, HandlerContext, Route, RouteId};
pub use router::Router;
