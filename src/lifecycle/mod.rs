//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main):
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain background writes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Background work (background.rs):
//!     Strategy wait_until(write) → tracked task → drained at shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain anchored work, close
//! - Shutdown has a deadline: forced exit after it passes
//! - Background anchoring is explicit via `RequestEvent::wait_until`

pub mod background;
pub mod shutdown;
pub mod signals;

pub use background::{BackgroundTasks, RequestEvent};
pub use shutdown::Shutdown;
