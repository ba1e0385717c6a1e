//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch wrapper attempt fails or returns a gateway-class status:
//!     → retries.rs (check if the request is retryable at all)
//!     → compute jittered exponential backoff
//!     → sleep, retry, until max_attempts is reached
//! ```
//!
//! # Design Decisions
//! - Retries only for idempotent requests (GET, HEAD, OPTIONS)
//! - Jittered backoff prevents thundering herd against a recovering origin
//! - Attempt count is bounded per request; there is no global budget

pub mod retries;
