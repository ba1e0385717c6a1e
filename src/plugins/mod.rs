//! Plugin subsystem.
//!
//! # Data Flow
//! ```text
//! Strategy / wrapper operation
//!     → iterate supplied plugin list in order
//!     → invoke only the plugins that define the current hook
//!     → chained hooks: output of plugin N is input of plugin N+1
//!     → observer hooks: invoked sequentially, return value ignored
//! ```
//!
//! # Design Decisions
//! - A plugin is a fixed-shape capability record: one optional async
//!   callback per hook, so "does this plugin define the hook" is a field
//!   check, not dynamic probing
//! - Execution order across plugins is the order of the supplied list,
//!   never sorted
//! - Hooks are fallible; contract breaches surface as
//!   `PluginContractViolation` at the call site that detects them

pub mod hooks;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::GatewayResult;
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::plugins::hooks::{
    CacheDidUpdateArgs, CacheKeyArgs, CacheWillUpdateArgs, CachedResponseArgs, FetchDidFailArgs,
    FetchDidSucceedArgs, HandlerDidCompleteArgs, HandlerDidRespondArgs, HandlerWillRespondArgs,
    HandlerWillStartArgs, RequestWillFetchArgs,
};

/// A boxed async hook callback.
pub type HookFn<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, GatewayResult<R>> + Send + Sync>;

/// An extension point: a named record of optional lifecycle callbacks.
///
/// Cloning a plugin clones callback handles, not the callbacks themselves,
/// so one plugin value can back several strategies.
#[derive(Clone, Default)]
pub struct Plugin {
    name: String,
    pub cache_key_will_be_used: Option<HookFn<CacheKeyArgs, GatewayRequest>>,
    pub request_will_fetch: Option<HookFn<RequestWillFetchArgs, GatewayRequest>>,
    pub fetch_did_succeed: Option<HookFn<FetchDidSucceedArgs, GatewayResponse>>,
    pub fetch_did_fail: Option<HookFn<FetchDidFailArgs, ()>>,
    pub cache_will_update: Option<HookFn<CacheWillUpdateArgs, Option<GatewayResponse>>>,
    pub cache_did_update: Option<HookFn<CacheDidUpdateArgs, ()>>,
    pub cached_response_will_be_used: Option<HookFn<CachedResponseArgs, Option<GatewayResponse>>>,
    pub handler_will_start: Option<HookFn<HandlerWillStartArgs, ()>>,
    pub handler_will_respond: Option<HookFn<HandlerWillRespondArgs, GatewayResponse>>,
    pub handler_did_respond: Option<HookFn<HandlerDidRespondArgs, ()>>,
    pub handler_did_complete: Option<HookFn<HandlerDidCompleteArgs, ()>>,
}

impl Plugin {
    /// Start building a plugin. The name appears in logs and errors.
    pub fn builder(name: impl Into<String>) -> PluginBuilder {
        PluginBuilder {
            plugin: Plugin {
                name: name.into(),
                ..Plugin::default()
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut hooks = Vec::new();
        if self.cache_key_will_be_used.is_some() {
            hooks.push("cache_key_will_be_used");
        }
        if self.request_will_fetch.is_some() {
            hooks.push("request_will_fetch");
        }
        if self.fetch_did_succeed.is_some() {
            hooks.push("fetch_did_succeed");
        }
        if self.fetch_did_fail.is_some() {
            hooks.push("fetch_did_fail");
        }
        if self.cache_will_update.is_some() {
            hooks.push("cache_will_update");
        }
        if self.cache_did_update.is_some() {
            hooks.push("cache_did_update");
        }
        if self.cached_response_will_be_used.is_some() {
            hooks.push("cached_response_will_be_used");
        }
        if self.handler_will_start.is_some() {
            hooks.push("handler_will_start");
        }
        if self.handler_will_respond.is_some() {
            hooks.push("handler_will_respond");
        }
        if self.handler_did_respond.is_some() {
            hooks.push("handler_did_respond");
        }
        if self.handler_did_complete.is_some() {
            hooks.push("handler_did_complete");
        }
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .finish()
    }
}

fn boxed<A, R, F, Fut>(f: F) -> HookFn<A, R>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<R>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)))
}

/// Builder for [`Plugin`]; each method installs one hook callback.
pub struct PluginBuilder {
    plugin: Plugin,
}

impl PluginBuilder {
    pub fn cache_key_will_be_used<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CacheKeyArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<GatewayRequest>> + Send + 'static,
    {
        self.plugin.cache_key_will_be_used = Some(boxed(f));
        self
    }

    pub fn request_will_fetch<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestWillFetchArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<GatewayRequest>> + Send + 'static,
    {
        self.plugin.request_will_fetch = Some(boxed(f));
        self
    }

    pub fn fetch_did_succeed<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FetchDidSucceedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<GatewayResponse>> + Send + 'static,
    {
        self.plugin.fetch_did_succeed = Some(boxed(f));
        self
    }

    pub fn fetch_did_fail<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(FetchDidFailArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.plugin.fetch_did_fail = Some(boxed(f));
        self
    }

    pub fn cache_will_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CacheWillUpdateArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<Option<GatewayResponse>>> + Send + 'static,
    {
        self.plugin.cache_will_update = Some(boxed(f));
        self
    }

    pub fn cache_did_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CacheDidUpdateArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.plugin.cache_did_update = Some(boxed(f));
        self
    }

    pub fn cached_response_will_be_used<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(CachedResponseArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<Option<GatewayResponse>>> + Send + 'static,
    {
        self.plugin.cached_response_will_be_used = Some(boxed(f));
        self
    }

    pub fn handler_will_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerWillStartArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.plugin.handler_will_start = Some(boxed(f));
        self
    }

    pub fn handler_will_respond<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerWillRespondArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<GatewayResponse>> + Send + 'static,
    {
        self.plugin.handler_will_respond = Some(boxed(f));
        self
    }

    pub fn handler_did_respond<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerDidRespondArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.plugin.handler_did_respond = Some(boxed(f));
        self
    }

    pub fn handler_did_complete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerDidCompleteArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        self.plugin.handler_did_complete = Some(boxed(f));
        self
    }

    pub fn build(self) -> Plugin {
        self.plugin
    }
}
