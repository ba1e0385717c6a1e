//! Network-only strategy: no cache involvement at all.

use async_trait::async_trait;

use crate::error::GatewayResult;
use crate::http::response::GatewayResponse;
use crate::routing::route::{Handler, HandlerContext};
use crate::strategy::StrategyCore;

/// Always fetch from the network. A network failure is terminal.
pub struct NetworkOnly {
    core: StrategyCore,
}

impl NetworkOnly {
    pub fn new(core: StrategyCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Handler for NetworkOnly {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        let core = self.core.clone();

        self.core
            .run(cx, |cx| async move {
                let response = core.fetch(&cx.request, &cx.state).await?;
                Ok(Some(response))
            })
            .await
    }
}
