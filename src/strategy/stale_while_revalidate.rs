//! Stale-while-revalidate strategy: answer stale, refresh behind.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::GatewayResult;
use crate::http::response::GatewayResponse;
use crate::routing::route::{Handler, HandlerContext};
use crate::strategy::StrategyCore;

/// Read the cache and start a network fetch at the same time. A cached value
/// is returned immediately; the fetch always completes in the background and
/// its result is written to cache either way.
pub struct StaleWhileRevalidate {
    core: StrategyCore,
}

impl StaleWhileRevalidate {
    pub fn new(core: StrategyCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Handler for StaleWhileRevalidate {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        let core = self.core.clone();

        self.core
            .run(cx, |cx| async move {
                let (tx, rx) = oneshot::channel();

                // Revalidation runs unconditionally, even when the cache
                // answers the request.
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
                                        "Revalidation cache write failed"
                                    );
                                }
                            }
                            Err(error) => {
                                tracing::debug!(
                                    url = %request.cache_key(),
                                    %error,
                                    "Revalidation fetch failed"
                                );
                                let _ = tx.send(Err(error));
                            }
                        }
                    });
                }

                if let Some(cached) = core.read_cache(&cx.request, &cx.state).await? {
                    return Ok(Some(cached));
                }

                // Cold cache: the revalidation fetch is the response.
                match rx.await {
                    Ok(Ok(response)) => Ok(Some(response)),
                    Ok(Err(error)) => Err(error),
                    Err(_closed) => Ok(None),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::GatewayRequest;
    use crate::plugins::state::RequestState;
    use crate::strategy::testing::{core_with, network_error, ScriptedUpstream};

    fn cx(url: &str) -> HandlerContext {
        HandlerContext::standalone(GatewayRequest::get(url).unwrap())
    }

    #[tokio::test]
    async fn test_cold_cache_returns_network_and_leaves_one_entry() {
        let upstream = ScriptedUpstream::new(vec![Ok(GatewayResponse::ok("net"))]);
        let core = core_with(upstream, vec![]);
        let strategy = StaleWhileRevalidate::new(core.clone());

        let cx = cx("http://o.local/a");
        let event = cx.event.clone();
        let response = strategy.handle(cx).await.unwrap().unwrap();
        assert_eq!(response.body().as_ref(), b"net");

        event.background().wait_idle().await;
        let cache = core.cache().storage().open("runtime").await.unwrap();
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_hit_returns_cache_and_still_revalidates() {
        let upstream = ScriptedUpstream::new(vec![Ok(GatewayResponse::ok("fresh"))]);
        let core = core_with(upstream.clone(), vec![]);

        core.write_cache(
            &GatewayRequest::get("http://o.local/a").unwrap(),
            GatewayResponse::ok("stale"),
            &RequestState::new(),
        )
        .await
        .unwrap();

        let strategy = StaleWhileRevalidate::new(core.clone());
        let cx = cx("http://o.local/a");
        let event = cx.event.clone();
        let response = strategy.handle(cx).await.unwrap().unwrap();
        assert_eq!(response.body().as_ref(), b"stale");

        event.background().wait_idle().await;
        assert_eq!(upstream.call_count(), 1);
        let refreshed = core
            .read_cache(
                &GatewayRequest::get("http://o.local/a").unwrap(),
                &RequestState::new(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.body().as_ref(), b"fresh");
    }

    #[tokio::test]
    async fn test_cold_cache_with_dead_network_propagates() {
        let upstream = ScriptedUpstream::new(vec![Err(network_error("http://o.local/a"))]);
        let strategy = StaleWhileRevalidate::new(core_with(upstream, vec![]));

        let result = strategy.handle(cx("http://o.local/a")).await;
        assert!(result.is_err());
    }
}
