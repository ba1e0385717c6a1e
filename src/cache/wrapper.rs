//! Cache access wrapper: every read and write goes through here.
//!
//! # Responsibilities
//! - Derive the effective cache key via `cache_key_will_be_used`
//! - Gate writes on `cache_will_update` (default: status 200 only)
//! - Run `cache_did_update` observers with the prior entry value
//! - Thread reads through `cached_response_will_be_used`
//! - Run quota-error callbacks before re-raising `QuotaExceeded`
//!
//! # Design Decisions
//! - A vetoed write is silent success, not an error
//! - The prior-entry read happens only when some plugin actually observes
//!   `cache_did_update`; otherwise writes cost a single storage operation
//! - Reads and writes derive their keys with distinct mode markers so
//!   plugins may key the two directions differently

use std::sync::Arc;

use axum::http::Method;

use crate::cache::quota::execute_quota_error_callbacks;
use crate::cache::storage::{CacheStorage, MatchOptions};
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::observability::metrics;
use crate::plugins::hooks::{
    CacheDidUpdateArgs, CacheKeyArgs, CacheKeyMode, CacheWillUpdateArgs, CachedResponseArgs,
    HookName,
};
use crate::plugins::state::RequestState;
use crate::plugins::Plugin;

/// Plugin-aware façade over a [`CacheStorage`].
#[derive(Clone)]
pub struct CacheAccess {
    storage: Arc<dyn CacheStorage>,
}

impl CacheAccess {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    /// Write `response` to `cache_name` under the request's effective key.
    ///
    /// Fails with `NonGetCacheWrite` for non-GET requests and
    /// `MissingResponse` when there is nothing to store. A write vetoed by
    /// `cache_will_update` returns `Ok` without touching storage.
    pub async fn write(
        &self,
        cache_name: &str,
        request: &GatewayRequest,
        response: Option<GatewayResponse>,
        plugins: &[Plugin],
        state: &RequestState,
    ) -> GatewayResult<()> {
        if request.method() != &Method::GET {
            return Err(GatewayError::NonGetCacheWrite {
                method: request.method().clone(),
                url: request.cache_key().to_string(),
            });
        }

        let effective = self
            .effective_request(CacheKeyMode::Write, request, plugins, state)
            .await?;
        if effective.method() != &Method::GET {
            return Err(GatewayError::PluginContractViolation {
                plugin: last_key_plugin_name(plugins),
                hook: HookName::CacheKeyWillBeUsed.as_str(),
                detail: format!(
                    "write key for '{}' was rewritten to method {}",
                    effective.cache_key(),
                    effective.method()
                ),
            });
        }

        let Some(response) = response else {
            return Err(GatewayError::MissingResponse {
                url: effective.cache_key().to_string(),
            });
        };

        let Some(response_to_cache) = self
            .apply_cache_will_update(&effective, response, plugins, state)
            .await?
        else {
            tracing::debug!(
                cache = %cache_name,
                url = %effective.cache_key(),
                "Response rejected for caching"
            );
            return Ok(());
        };

        let cache = self.storage.open(cache_name).await?;

        // The prior value is only needed when someone will observe it.
        let update_observers: Vec<&Plugin> = plugins
            .iter()
            .filter(|p| p.cache_did_update.is_some())
            .collect();
        let old_response = if update_observers.is_empty() {
            None
        } else {
            cache
                .match_request(&effective, &MatchOptions::default())
                .await?
        };

        if let Err(error) = cache.put(&effective, &response_to_cache).await {
            if matches!(error, GatewayError::QuotaExceeded { .. }) {
                metrics::record_quota_exceeded(cache_name);
                execute_quota_error_callbacks().await;
            }
            return Err(error);
        }

        metrics::record_cache_write(cache_name);
        tracing::debug!(
            cache = %cache_name,
            url = %effective.cache_key(),
            "Cache entry written"
        );

        for plugin in update_observers {
            let hook = plugin
                .cache_did_update
                .as_ref()
                .expect("filtered on presence");
            hook(CacheDidUpdateArgs {
                cache_name: cache_name.to_string(),
                request: effective.clone(),
                old_response: old_response.clone(),
                new_response: response_to_cache.clone(),
                state: state.clone(),
            })
            .await?;
        }

        Ok(())
    }

    /// Look up the request's effective key in `cache_name`.
    ///
    /// The raw lookup result is threaded through every
    /// `cached_response_will_be_used` plugin in order; any of them may
    /// replace or discard it.
    pub async fn read(
        &self,
        cache_name: &str,
        request: &GatewayRequest,
        options: MatchOptions,
        plugins: &[Plugin],
        state: &RequestState,
    ) -> GatewayResult<Option<GatewayResponse>> {
        let effective = self
            .effective_request(CacheKeyMode::Read, request, plugins, state)
            .await?;

        let cache = self.storage.open(cache_name).await?;
        let mut cached = cache.match_request(&effective, &options).await?;
        metrics::record_cache_read(cache_name, cached.is_some());

        for plugin in plugins {
            if let Some(hook) = &plugin.cached_response_will_be_used {
                cached = hook(CachedResponseArgs {
                    cache_name: cache_name.to_string(),
                    request: effective.clone(),
                    cached_response: cached,
                    state: state.clone(),
                })
                .await?;
            }
        }

        Ok(cached)
    }

    /// Run the `cache_key_will_be_used` chain for the given mode.
    async fn effective_request(
        &self,
        mode: CacheKeyMode,
        request: &GatewayRequest,
        plugins: &[Plugin],
        state: &RequestState,
    ) -> GatewayResult<GatewayRequest> {
        let mut effective = request.clone();
        for plugin in plugins {
            if let Some(hook) = &plugin.cache_key_will_be_used {
                effective = hook(CacheKeyArgs {
                    mode,
                    request: effective,
                    state: state.clone(),
                })
                .await?;
            }
        }
        Ok(effective)
    }

    /// Decide cache-worthiness. With no `cache_will_update` plugin the
    /// default applies: cache only status 200 exactly.
    async fn apply_cache_will_update(
        &self,
        request: &GatewayRequest,
        response: GatewayResponse,
        plugins: &[Plugin],
        state: &RequestState,
    ) -> GatewayResult<Option<GatewayResponse>> {
        let mut any_plugin = false;
        let mut current = Some(response);

        for plugin in plugins {
            if let Some(hook) = &plugin.cache_will_update {
                any_plugin = true;
                let Some(response) = current.take() else {
                    break;
                };
                current = hook(CacheWillUpdateArgs {
                    request: request.clone(),
                    response,
                    state: state.clone(),
                })
                .await?;
                if current.is_none() {
                    break;
                }
            }
        }

        if !any_plugin {
            current = current.filter(|r| r.status() == axum::http::StatusCode::OK);
        }

        Ok(current)
    }
}

fn last_key_plugin_name(plugins: &[Plugin]) -> String {
    plugins
        .iter()
        .rev()
        .find(|p| p.cache_key_will_be_used.is_some())
        .map(|p| p.name().to_string())
        .unwrap_or_else(|| "unknown".into())
}
