//! Background task tracking and the per-request event surface.
//!
//! # Responsibilities
//! - Track fire-and-forget work (background cache writes) per process
//! - Let graceful shutdown drain that work before exit
//! - Hand each dispatched request an `wait_until` anchor
//!
//! # Design Decisions
//! - Anchoring is explicit: a strategy that spawns background work must go
//!   through `RequestEvent::wait_until`, nothing is implicit
//! - A guard decrements the count on drop, so a panicking task still
//!   releases its slot

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks in-flight background tasks for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    active_count: Arc<AtomicU64>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked background task.
    pub fn spawn(&self, future: impl Future<Output = ()> + Send + 'static) {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard {
            active_count: Arc::clone(&self.active_count),
        };
        tokio::spawn(async move {
            future.await;
            drop(guard);
        });
    }

    /// Current number of in-flight background tasks.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until all tracked tasks have settled.
    pub async fn wait_idle(&self) {
        while self.active_count.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Guard that releases a task slot when dropped.
#[derive(Debug)]
struct TaskGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The host surface handed to every dispatched request.
///
/// Strategies pass fire-and-forget work (opportunistic cache writes) to
/// [`wait_until`](RequestEvent::wait_until) so the process stays alive until
/// it settles.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    request_id: String,
    background: BackgroundTasks,
}

impl RequestEvent {
    pub fn new(request_id: impl Into<String>, background: BackgroundTasks) -> Self {
        Self {
            request_id: request_id.into(),
            background,
        }
    }

    /// A standalone event with its own task tracker, for tests and
    /// out-of-band dispatches.
    pub fn detached() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), BackgroundTasks::new())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Anchor background work to the process lifetime.
    pub fn wait_until(&self, future: impl Future<Output = ()> + Send + 'static) {
        self.background.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracked_tasks_drain() {
        let tasks = BackgroundTasks::new();
        assert_eq!(tasks.active_count(), 0);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tasks.spawn(async move {
            let _ = rx.await;
        });
        assert_eq!(tasks.active_count(), 1);

        tx.send(()).unwrap();
        tasks.wait_idle().await;
        assert_eq!(tasks.active_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_until_is_tracked() {
        let event = RequestEvent::detached();
        event.wait_until(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        });
        assert_eq!(event.background().active_count(), 1);
        event.background().wait_idle().await;
        assert_eq!(event.background().active_count(), 0);
    }
}
