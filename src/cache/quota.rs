//! Process-wide quota-error callback registry.
//!
//! Collaborators that can free space (precache cleanup, expiration sweeps)
//! register a callback here; every cache write that hits `QuotaExceeded`
//! runs them all, in registration order, before the error is re-raised.
//! The registry lives for the whole process and is append-only.

use std::future::Future;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use once_cell::sync::Lazy;

use crate::error::GatewayResult;

type QuotaErrorCallback = Arc<dyn Fn() -> BoxFuture<'static, GatewayResult<()>> + Send + Sync>;

/// An ordered, append-only list of space-recovery callbacks.
#[derive(Default)]
pub struct QuotaRegistry {
    callbacks: Mutex<Vec<QuotaErrorCallback>>,
}

impl QuotaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback; it keeps its position for the process lifetime.
    pub fn register<F, Fut>(&self, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let boxed: QuotaErrorCallback = Arc::new(move || Box::pin(callback()));
        self.callbacks
            .lock()
            .expect("quota registry mutex poisoned")
            .push(boxed);
    }

    /// Run every registered callback once, in registration order.
    ///
    /// A failing callback is logged and does not stop the rest; the quota
    /// error that triggered this is re-raised by the caller regardless.
    pub async fn execute(&self) {
        let callbacks: Vec<QuotaErrorCallback> = self
            .callbacks
            .lock()
            .expect("quota registry mutex poisoned")
            .clone();

        tracing::debug!(count = callbacks.len(), "Running quota error callbacks");

        for callback in callbacks {
            if let Err(error) = callback().await {
                tracing::warn!(%error, "Quota error callback failed");
            }
        }
    }
}

static GLOBAL: Lazy<QuotaRegistry> = Lazy::new(QuotaRegistry::new);

/// Register a callback on the process-wide registry.
pub fn register_quota_error_callback<F, Fut>(callback: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<()>> + Send + 'static,
{
    GLOBAL.register(callback);
}

/// Run the process-wide registry.
pub(crate) async fn execute_quota_error_callbacks() {
    GLOBAL.execute().await;
}
