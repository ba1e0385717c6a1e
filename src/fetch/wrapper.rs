//! Network fetch wrapper: every outbound request goes through here.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::RetryConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::observability::metrics;
use crate::plugins::hooks::{FetchDidFailArgs, FetchDidSucceedArgs, RequestWillFetchArgs};
use crate::plugins::state::RequestState;
use crate::plugins::Plugin;
use crate::resilience::retries::{backoff_delay, is_retryable};

/// The network seam: something that can forward a request and produce a
/// buffered response.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse>;
}

/// Hyper-client [`Upstream`] implementation.
pub struct HttpUpstream {
    client: Client<HttpConnector, Body>,
    body_limit: usize,
}

impl HttpUpstream {
    pub fn new(body_limit: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, body_limit }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
        let url = request.cache_key().to_string();
        let http_request = request.into_http()?;

        let response = self
            .client
            .request(http_request)
            .await
            .map_err(|e| GatewayError::NetworkFailure {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(Body::new(body), self.body_limit)
            .await
            .map_err(|e| GatewayError::NetworkFailure {
                url,
                reason: format!("body read failed: {}", e),
            })?;

        Ok(GatewayResponse::from_parts(parts, bytes))
    }
}

/// Plugin-aware façade over an [`Upstream`].
#[derive(Clone)]
pub struct Fetcher {
    upstream: Arc<dyn Upstream>,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(upstream: Arc<dyn Upstream>, retry: RetryConfig) -> Self {
        Self { upstream, retry }
    }

    /// Fetch through the plugin pipeline.
    ///
    /// Runs the `request_will_fetch` chain, forwards (with bounded retries
    /// for idempotent requests), then either the `fetch_did_succeed` chain
    /// or the `fetch_did_fail` observers.
    pub async fn fetch(
        &self,
        request: &GatewayRequest,
        plugins: &[Plugin],
        state: &RequestState,
    ) -> GatewayResult<GatewayResponse> {
        let original = request.clone();

        let mut outbound = request.clone();
        for plugin in plugins {
            if let Some(hook) = &plugin.request_will_fetch {
                outbound = hook(RequestWillFetchArgs {
                    request: outbound,
                    state: state.clone(),
                })
                .await?;
            }
        }

        let max_attempts = if self.retry.enabled {
            self.retry.max_attempts.max(1)
        } else {
            1
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;

            match self.upstream.forward(outbound.clone()).await {
                Ok(response) => {
                    if attempts < max_attempts
                        && is_retryable(outbound.method(), Some(response.status()))
                    {
                        let delay = backoff_delay(
                            attempts,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(
                            url = %outbound.cache_key(),
                            attempt = attempts,
                            status = %response.status(),
                            delay = ?delay,
                            "Retrying after gateway-class status"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    metrics::record_fetch(true);
                    let mut response = response;
                    for plugin in plugins {
                        if let Some(hook) = &plugin.fetch_did_succeed {
                            response = hook(FetchDidSucceedArgs {
                                request: outbound.clone(),
                                response,
                                state: state.clone(),
                            })
                            .await?;
                        }
                    }
                    return Ok(response);
                }
                Err(error @ GatewayError::NetworkFailure { .. }) => {
                    if attempts < max_attempts && is_retryable(outbound.method(), None) {
                        let delay = backoff_delay(
                            attempts,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::info!(
                            url = %outbound.cache_key(),
                            attempt = attempts,
                            delay = ?delay,
                            "Retrying after network error"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    metrics::record_fetch(false);
                    tracing::warn!(
                        url = %outbound.cache_key(),
                        attempts,
                        %error,
                        "Fetch failed"
                    );

                    let shared = Arc::new(error.clone());
                    for plugin in plugins {
                        if let Some(hook) = &plugin.fetch_did_fail {
                            let result = hook(FetchDidFailArgs {
                                original_request: original.clone(),
                                request: outbound.clone(),
                                error: shared.clone(),
                                state: state.clone(),
                            })
                            .await;
                            if let Err(hook_error) = result {
                                tracing::warn!(
                                    plugin = plugin.name(),
                                    %hook_error,
                                    "fetch_did_fail observer failed"
                                );
                            }
                        }
                    }

                    return Err(error);
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyUpstream {
        calls: AtomicU32,
        fail_first: u32,
    }

    #[async_trait]
    impl Upstream for FlakyUpstream {
        async fn forward(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(GatewayError::NetworkFailure {
                    url: request.cache_key().to_string(),
                    reason: "connection refused".into(),
                })
            } else {
                Ok(GatewayResponse::ok("recovered"))
            }
        }
    }

    fn retrying_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            enabled: true,
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let upstream = Arc::new(FlakyUpstream {
            calls: AtomicU32::new(0),
            fail_first: 2,
        });
        let fetcher = Fetcher::new(upstream.clone(), retrying_config(3));

        let response = fetcher
            .fetch(
                &GatewayRequest::get("http://o.local/a").unwrap(),
                &[],
                &RequestState::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.body().as_ref(), b"recovered");
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_did_fail_fires_once_after_all_attempts() {
        let upstream = Arc::new(FlakyUpstream {
            calls: AtomicU32::new(0),
            fail_first: 10,
        });
        let fetcher = Fetcher::new(upstream.clone(), retrying_config(3));

        let failures = Arc::new(AtomicU32::new(0));
        let counter = failures.clone();
        let observer = Plugin::builder("observer")
            .fetch_did_fail(move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build();

        let err = fetcher
            .fetch(
                &GatewayRequest::get("http://o.local/a").unwrap(),
                &[observer],
                &RequestState::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NetworkFailure { .. }));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_will_fetch_rewrites_outbound() {
        struct EchoUrl;
        #[async_trait]
        impl Upstream for EchoUrl {
            async fn forward(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
                Ok(GatewayResponse::ok(request.cache_key().to_string()))
            }
        }

        let fetcher = Fetcher::new(Arc::new(EchoUrl), RetryConfig::default());
        let rewrite = Plugin::builder("rewrite")
            .request_will_fetch(|args| async move {
                GatewayRequest::get(&format!("{}?traced=1", args.request.cache_key()))
            })
            .build();

        let response = fetcher
            .fetch(
                &GatewayRequest::get("http://o.local/a").unwrap(),
                &[rewrite],
                &RequestState::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.body().as_ref(), b"http://o.local/a?traced=1");
    }

    #[tokio::test]
    async fn test_fetch_did_succeed_transforms_response() {
        struct Fixed;
        #[async_trait]
        impl Upstream for Fixed {
            async fn forward(&self, _request: GatewayRequest) -> GatewayResult<GatewayResponse> {
                Ok(GatewayResponse::ok("plain"))
            }
        }

        let fetcher = Fetcher::new(Arc::new(Fixed), RetryConfig::default());
        let stamp = Plugin::builder("stamp")
            .fetch_did_succeed(|args| async move {
                let mut response = args.response;
                response
                    .headers_mut()
                    .insert("x-fetched-via", "gateway".parse().unwrap());
                Ok(response)
            })
            .build();

        let response = fetcher
            .fetch(
                &GatewayRequest::get("http://o.local/a").unwrap(),
                &[stamp],
                &RequestState::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get("x-fetched-via").unwrap(), "gateway");
    }
}
