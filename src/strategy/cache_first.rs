//! Cache-first strategy: cheap hits, network only on miss.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::http::response::GatewayResponse;
use crate::routing::route::{Handler, HandlerContext};
use crate::strategy::StrategyCore;

/// Serve from cache when possible; on a miss, fetch from the network,
/// cache the result best-effort and return it.
pub struct CacheFirst {
    core: StrategyCore,
}

impl CacheFirst {
    pub fn new(core: StrategyCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Handler for CacheFirst {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        let core = self.core.clone();

        self.core
            .run(cx, |cx| async move {
                if let Some(cached) = core.read_cache(&cx.request, &cx.state).await? {
                    return Ok(Some(cached));
                }

                let response = core.fetch(&cx.request, &cx.state).await?;
                core.spawn_cache_write(
                    &cx.event,
                    cx.request.clone(),
                    response.clone(),
                    &cx.state,
                );
                Ok(Some(response))
            })
            .await
    }
}
