//! Fetch subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy fetch
//!     → wrapper.rs (request_will_fetch chain)
//!     → Upstream::forward (hyper client, attempt loop with backoff)
//!     → On success: fetch_did_succeed chain → response to strategy
//!     → On final failure: fetch_did_fail observers → NetworkFailure
//! ```
//!
//! # Design Decisions
//! - The network seam is a trait so strategies can be exercised without
//!   sockets; the shipped implementation is the hyper legacy client
//! - Retries happen inside the wrapper: `fetch_did_fail` fires once, after
//!   the last attempt, never per attempt

pub mod wrapper;

pub use wrapper::{Fetcher, HttpUpstream, Upstream};
