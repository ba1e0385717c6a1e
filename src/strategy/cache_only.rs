//! Cache-only strategy: no network involvement at all.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::http::response::GatewayResponse;
use crate::routing::route::{Handler, HandlerContext};
use crate::strategy::StrategyCore;

/// Always answer from the cache. A miss is a no-response, never a fetch.
pub struct CacheOnly {
    core: StrategyCore,
}

impl CacheOnly {
    pub fn new(core: StrategyCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Handler for CacheOnly {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        let core = self.core.clone();

        self.core
            .run(cx, |cx| async move { core.read_cache(&cx.request, &cx.state).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::GatewayRequest;
    use crate::plugins::state::RequestState;
    use crate::strategy::testing::{core_with, ScriptedUpstream};

    #[tokio::test]
    async fn test_hit_returns_cached_without_network() {
        let upstream = ScriptedUpstream::new(vec![]);
        let core = core_with(upstream.clone(), vec![]);

        core.write_cache(
            &GatewayRequest::get("http://o.local/a").unwrap(),
            GatewayResponse::ok("cached"),
            &RequestState::new(),
        )
        .await
        .unwrap();

        let strategy = CacheOnly::new(core);
        let cx = HandlerContext::standalone(GatewayRequest::get("http://o.local/a").unwrap());
        let response = strategy.handle(cx).await.unwrap().unwrap();
        assert_eq!(response.body().as_ref(), b"cached");
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_is_no_response() {
        let upstream = ScriptedUpstream::new(vec![]);
        let strategy = CacheOnly::new(core_with(upstream.clone(), vec![]));

        let cx = HandlerContext::standalone(GatewayRequest::get("http://o.local/a").unwrap());
        let response = strategy.handle(cx).await.unwrap();
        assert!(response.is_none());
        assert_eq!(upstream.call_count(), 0);
    }
}
