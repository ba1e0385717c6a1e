//! Cache subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy read/write
//!     → wrapper.rs (plugin hook pipeline around the operation)
//!     → storage.rs (named cache: in-memory map + JSON persistence)
//!     → On QuotaExceeded: quota.rs (run recovery callbacks, re-raise)
//! ```
//!
//! # Design Decisions
//! - Strategies never touch storage directly; the wrapper is the only path
//! - Named caches are shared, unsynchronized, last-write-wins stores
//! - Quota recovery is process-wide: any write failure fans out to every
//!   registered callback before the error reaches the strategy

pub mod quota;
pub mod storage;
pub mod wrapper;

pub use quota::{register_quota_error_callback, QuotaRegistry};
pub use storage::{Cache, CacheStorage, DiskCacheStorage, MatchOptions};
pub use wrapper::CacheAccess;
