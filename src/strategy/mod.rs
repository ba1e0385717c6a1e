//! Strategy subsystem.
//!
//! # Data Flow
//! ```text
//! Router dispatch → strategy.handle()
//!     → handler_will_start hooks (sequential)
//!     → variant body: arbitrate cache reads vs network fetches
//!         - network_first.rs (network, timeout-raced, cache fallback)
//!         - cache_first.rs (cache, network on miss)
//!         - stale_while_revalidate.rs (cache now, revalidate behind)
//!         - network_only.rs / cache_only.rs (single path, no fallback)
//!     → handler_will_respond hooks (may transform the response)
//!     → always: handler_did_respond, handler_did_complete
//! ```
//!
//! # Design Decisions
//! - Every cache and network touch goes through the wrappers; no variant
//!   bypasses the plugin pipeline
//! - Fire-and-forget cache writes are anchored via `RequestEvent::wait_until`
//!   so shutdown can drain them
//! - A strategy may produce no response (cold cache, dead network); the
//!   caller decides what that degrades to

pub mod cache_first;
pub mod cache_only;
pub mod network_first;
pub mod network_only;
pub mod stale_while_revalidate;

use std::future::Future;
use std::sync::Arc;

use crate::cache::storage::MatchOptions;
use crate::cache::wrapper::CacheAccess;
use crate::error::GatewayResult;
use crate::fetch::wrapper::Fetcher;
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::lifecycle::background::RequestEvent;
use crate::plugins::hooks::{
    HandlerDidCompleteArgs, HandlerDidRespondArgs, HandlerWillRespondArgs, HandlerWillStartArgs,
};
use crate::plugins::state::RequestState;
use crate::plugins::Plugin;
use crate::routing::route::HandlerContext;

pub use cache_first::CacheFirst;
pub use cache_only::CacheOnly;
pub use network_first::NetworkFirst;
pub use network_only::NetworkOnly;
pub use stale_while_revalidate::StaleWhileRevalidate;

/// What every strategy owns: a cache name, a plugin list and handles to the
/// two wrappers.
#[derive(Clone)]
pub struct StrategyCore {
    cache_name: String,
    plugins: Arc<Vec<Plugin>>,
    cache: CacheAccess,
    fetcher: Fetcher,
}

impl StrategyCore {
    pub fn new(
        cache_name: impl Into<String>,
        plugins: Vec<Plugin>,
        cache: CacheAccess,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            plugins: Arc::new(plugins),
            cache,
            fetcher,
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn cache(&self) -> &CacheAccess {
        &self.cache
    }

    pub(crate) async fn read_cache(
        &self,
        request: &GatewayRequest,
        state: &RequestState,
    ) -> GatewayResult<Option<GatewayResponse>> {
        self.cache
            .read(
                &self.cache_name,
                request,
                MatchOptions::default(),
                &self.plugins,
                state,
            )
            .await
    }

    pub(crate) async fn write_cache(
        &self,
        request: &GatewayRequest,
        response: GatewayResponse,
        state: &RequestState,
    ) -> GatewayResult<()> {
        self.cache
            .write(
                &self.cache_name,
                request,
                Some(response),
                &self.plugins,
                state,
            )
            .await
    }

    pub(crate) async fn fetch(
        &self,
        request: &GatewayRequest,
        state: &RequestState,
    ) -> GatewayResult<GatewayResponse> {
        self.fetcher.fetch(request, &self.plugins, state).await
    }

    /// Fire-and-forget cache write, anchored to the host's lifetime surface.
    pub(crate) fn spawn_cache_write(
        &self,
        event: &RequestEvent,
        request: GatewayRequest,
        response: GatewayResponse,
        state: &RequestState,
    ) {
        let core = self.clone();
        let state = state.clone();
        event.wait_until(async move {
            if let Err(error) = core.write_cache(&request, response, &state).await {
                tracing::warn!(
                    cache = %core.cache_name,
                    url = %request.cache_key(),
                    %error,
                    "Background cache write failed"
                );
            }
        });
    }

    /// Run a variant body inside the strategy lifecycle hooks.
    ///
    /// `handler_did_respond` and `handler_did_complete` always run, whatever
    /// the body did; cleanup-hook failures are logged, never masking the
    /// body's own outcome.
    pub(crate) async fn run<F, Fut>(
        &self,
        cx: HandlerContext,
        body: F,
    ) -> GatewayResult<Option<GatewayResponse>>
    where
        F: FnOnce(HandlerContext) -> Fut + Send,
        Fut: Future<Output = GatewayResult<Option<GatewayResponse>>> + Send,
    {
        let request = cx.request.clone();
        let state = cx.state.clone();

        let mut outcome = match self.run_will_start(&request, &state).await {
            Ok(()) => body(cx).await,
            Err(error) => Err(error),
        };

        // handler_will_respond may transform a produced response.
        outcome = match outcome {
            Ok(Some(response)) => self
                .run_will_respond(&request, response, &state)
                .await
                .map(Some),
            other => other,
        };

        let final_response = outcome.as_ref().ok().cloned().flatten();
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.handler_did_respond {
                let result = hook(HandlerDidRespondArgs {
                    request: request.clone(),
                    response: final_response.clone(),
                    state: state.clone(),
                })
                .await;
                if let Err(error) = result {
                    tracing::warn!(plugin = plugin.name(), %error, "handler_did_respond failed");
                }
            }
        }

        let shared_error = outcome.as_ref().err().map(|e| Arc::new(e.clone()));
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.handler_did_complete {
                let result = hook(HandlerDidCompleteArgs {
                    request: request.clone(),
                    response: final_response.clone(),
                    error: shared_error.clone(),
                    state: state.clone(),
                })
                .await;
                if let Err(error) = result {
                    tracing::warn!(plugin = plugin.name(), %error, "handler_did_complete failed");
                }
            }
        }

        outcome
    }

    async fn run_will_start(
        &self,
        request: &GatewayRequest,
        state: &RequestState,
    ) -> GatewayResult<()> {
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.handler_will_start {
                hook(HandlerWillStartArgs {
                    request: request.clone(),
                    state: state.clone(),
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn run_will_respond(
        &self,
        request: &GatewayRequest,
        response: GatewayResponse,
        state: &RequestState,
    ) -> GatewayResult<GatewayResponse> {
        let mut response = response;
        for plugin in self.plugins.iter() {
            if let Some(hook) = &plugin.handler_will_respond {
                response = hook(HandlerWillRespondArgs {
                    request: request.clone(),
                    response,
                    state: state.clone(),
                })
                .await?;
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::cache::storage::DiskCacheStorage;
    use crate::cache::wrapper::CacheAccess;
    use crate::config::RetryConfig;
    use crate::error::{GatewayError, GatewayResult};
    use crate::fetch::wrapper::{Fetcher, Upstream};
    use crate::http::request::GatewayRequest;
    use crate::http::response::GatewayResponse;

    /// Scripted upstream: pops one canned result per call.
    pub struct ScriptedUpstream {
        pub calls: AtomicU32,
        pub delay: Option<Duration>,
        script: Mutex<VecDeque<GatewayResult<GatewayResponse>>>,
    }

    impl ScriptedUpstream {
        pub fn new(script: Vec<GatewayResult<GatewayResponse>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                delay: None,
                script: Mutex::new(script.into()),
            })
        }

        pub fn slow(
            delay: Duration,
            script: Vec<GatewayResult<GatewayResponse>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                delay: Some(delay),
                script: Mutex::new(script.into()),
            })
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn forward(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(GatewayError::NetworkFailure {
                        url: request.cache_key().to_string(),
                        reason: "script exhausted".into(),
                    })
                })
        }
    }

    pub fn network_error(url: &str) -> GatewayError {
        GatewayError::NetworkFailure {
            url: url.into(),
            reason: "connection refused".into(),
        }
    }

    pub fn core_with(
        upstream: Arc<ScriptedUpstream>,
        plugins: Vec<crate::plugins::Plugin>,
    ) -> super::StrategyCore {
        let cache = CacheAccess::new(Arc::new(DiskCacheStorage::in_memory()));
        let fetcher = Fetcher::new(upstream, RetryConfig::default());
        super::StrategyCore::new("runtime", plugins, cache, fetcher)
    }
}
