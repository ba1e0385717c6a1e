//! Network-first strategy: prefer fresh, fall back to cache.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::GatewayResult;
use crate::http::response::GatewayResponse;
use crate::routing::route::{Handler, HandlerContext};
use crate::strategy::StrategyCore;

/// Fetch from the network, opportunistically caching the result; fall back
/// to the cache when the network fails or the optional timeout elapses.
///
/// The timeout only abandons *waiting*: the fetch keeps running, anchored to
/// the request's lifetime surface, and still writes its result to cache when
/// it eventually lands.
pub struct NetworkFirst {
    core: StrategyCore,
    network_timeout: Option<Duration>,
}

impl NetworkFirst {
    pub fn new(core: StrategyCore) -> Self {
        Self {
            core,
            network_timeout: None,
        }
    }

    /// Bound the wait for the network before falling back to cache.
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Handler for NetworkFirst {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        let core = self.core.clone();
        let network_timeout = self.network_timeout;

        self.core
            .run(cx, |cx| async move {
                let (tx, rx) = oneshot::channel();

                // The network attempt runs to completion regardless of who
                // is still listening, and caches its result when it lands.
                {
                    let core = core.clone();
                    let request = cx.request.clone();
                    let state = cx.state.clone();
                    cx.event.wait_until(async move {
                        match core.fetch(&request, &state).await {
                            Ok(response) => {
                                let _ = tx.send(Ok(response.clone()));
                                if let Err(error) =
                                    core.write_cache(&request, response, &state).await
                                {
                                    tracing::warn!(
                                        url = %request.cache_key(),
                                        %error,
                                        "Opportunistic cache write failed"
                                    );
                                }
                            }
                            Err(error) => {
                                let _ = tx.send(Err(error));
                            }
                        }
                    });
                }

                let network_outcome = match network_timeout {
                    Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                        Ok(received) => received.ok(),
                        Err(_elapsed) => {
                            tracing::debug!(
                                url = %cx.request.cache_key(),
                                timeout = ?timeout,
                                "Network timed out, falling back to cache"
                            );
                            None
                        }
                    },
                    None => rx.await.ok(),
                };

                match network_outcome {
                    Some(Ok(response)) => Ok(Some(response)),
                    Some(Err(error)) if error.is_recoverable_by_strategy() => {
                        tracing::debug!(
                            url = %cx.request.cache_key(),
                            %error,
                            "Network failed, falling back to cache"
                        );
                        core.read_cache(&cx.request, &cx.state).await
                    }
                    Some(Err(error)) => Err(error),
                    None => core.read_cache(&cx.request, &cx.state).await,
                }
            })
            .await
    }
}
