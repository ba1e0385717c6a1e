//! Shutdown coordination for the gateway.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::lifecycle::background::BackgroundTasks;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe
/// to, plus a drain step for anchored background work (in-flight cache
/// writes) so killing the listener does not lose them.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Drain anchored background work, up to `deadline`.
    pub async fn drain(&self, background: &BackgroundTasks, deadline: Duration) {
        let pending = background.active_count();
        if pending == 0 {
            return;
        }
        tracing::info!(pending, "Draining background tasks before exit");
        if tokio::time::timeout(deadline, background.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = background.active_count(),
                "Shutdown deadline reached with background tasks still pending"
            );
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
