//! Retry logic.
//!
//! # Responsibilities
//! - Determine if a request is retryable (idempotent methods only)
//! - Compute exponential backoff with jitter between attempts
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH (non-idempotent)
//! - Connection errors are always retryable; of the status codes, only the
//!   gateway-class ones (502, 503, 504) are

use std::time::Duration;

use axum::http::{Method, StatusCode};
use rand::Rng;

/// Whether a failed attempt may be retried.
///
/// `status` is `None` for transport-level failures (connection refused,
/// reset), which are always retryable for idempotent methods.
pub fn is_retryable(method: &Method, status: Option<StatusCode>) -> bool {
    let idempotent = matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS);
    if !idempotent {
        return false;
    }

    match status {
        None => true,
        Some(status) => matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ),
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: 0 to 10% of the delay.
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
