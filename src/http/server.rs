//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app and wire up middleware (tracing, timeout, IDs)
//! - Build the routing core from configuration (routes → strategies)
//! - Embody the host event surface: dispatch, passthrough, wait_until
//! - Bind the server to a listener with graceful shutdown
//!
//! # Design Decisions
//! - Requests are buffered at the edge; the core works on owned values
//! - "No response" from the router degrades to a transparent passthrough
//!   fetch against the origin, outside the plugin pipeline
//! - Background cache writes ride the shared `BackgroundTasks` tracker so
//!   shutdown can drain them

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router as AxumRouter,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::cache::storage::DiskCacheStorage;
use crate::cache::wrapper::CacheAccess;
use crate::config::{GatewayConfig, RouteConfig, StrategyKind};
use crate::error::{GatewayError, GatewayResult};
use crate::fetch::wrapper::{Fetcher, HttpUpstream};
use crate::http::request::{GatewayRequest, MakeRequestUuid};
use crate::lifecycle::background::{BackgroundTasks, RequestEvent};
use crate::observability::metrics;
use crate::plugins::state::RequestState;
use crate::routing::matcher::{AndMatcher, HostMatcher, PathPrefixMatcher, RouteMatcher};
use crate::routing::route::{Handler, Route};
use crate::routing::router::Router;
use crate::strategy::{
    CacheFirst, CacheOnly, NetworkFirst, NetworkOnly, StaleWhileRevalidate, StrategyCore,
};

/// Application state injected into the edge handler.
#[derive(Clone)]
pub struct GatewayState {
    pub router: Arc<Router>,
    pub background: BackgroundTasks,
    pub passthrough: Fetcher,
    pub origin: Url,
    pub body_limit: usize,
}

/// HTTP server fronting the routing core.
#[derive(Debug)]
pub struct HttpServer {
    app: AxumRouter,
    router: Arc<Router>,
    background: BackgroundTasks,
}

impl HttpServer {
    /// Build the server and routing core from configuration.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let origin = Url::parse(&config.upstream.origin)
            .map_err(|e| GatewayError::MalformedRequest(e.to_string()))?;

        let mut storage = DiskCacheStorage::new(
            config.storage.directory.as_ref().map(Into::into),
            config.storage.default_capacity_bytes,
        );
        for cache in &config.storage.caches {
            storage = storage.with_capacity(&cache.name, cache.capacity_bytes);
        }
        let cache = CacheAccess::new(Arc::new(storage));

        let upstream = Arc::new(HttpUpstream::new(config.upstream.body_limit_bytes));
        let fetcher = Fetcher::new(upstream, config.retries.clone());

        let router = Arc::new(Router::new());
        for route_config in &config.routes {
            let route = build_route(route_config, &cache, &fetcher)?;
            router.register_route(route)?;
        }

        let background = BackgroundTasks::new();
        let state = GatewayState {
            router: router.clone(),
            background: background.clone(),
            // Passthrough never retries and runs no plugins; it should
            // behave like no gateway at all.
            passthrough: Fetcher::new(
                Arc::new(HttpUpstream::new(config.upstream.body_limit_bytes)),
                Default::default(),
            ),
            origin,
            body_limit: config.listener.body_limit_bytes,
        };

        let app = Self::build_app(&config, state);
        Ok(Self {
            app,
            router,
            background,
        })
    }

    /// Build the Axum app with all middleware layers.
    fn build_app(config: &GatewayConfig, state: GatewayState) -> AxumRouter {
        AxumRouter::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                tower::ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The routing core, for registering extra routes or handlers.
    pub fn router(&self) -> Arc<Router> {
        self.router.clone()
    }

    /// The background-task tracker backing `wait_until`.
    pub fn background(&self) -> BackgroundTasks {
        self.background.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.app.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Turn one config entry into a registered route.
fn build_route(
    config: &RouteConfig,
    cache: &CacheAccess,
    fetcher: &Fetcher,
) -> GatewayResult<Route> {
    let mut matchers: Vec<Box<dyn RouteMatcher>> = Vec::new();
    if let Some(host) = &config.host {
        matchers.push(Box::new(HostMatcher::new(host)));
    }
    if let Some(prefix) = &config.path_prefix {
        matchers.push(Box::new(PathPrefixMatcher::new(prefix)));
    }
    if matchers.is_empty() {
        return Err(GatewayError::InvalidRoute(format!(
            "route '{}' has no match condition",
            config.name
        )));
    }
    let matcher: Arc<dyn RouteMatcher> = if matchers.len() == 1 {
        Arc::from(matchers.pop().expect("checked non-empty"))
    } else {
        Arc::new(AndMatcher::new(matchers))
    };

    let core = StrategyCore::new(&config.cache_name, Vec::new(), cache.clone(), fetcher.clone());
    let handler: Arc<dyn Handler> = match config.strategy {
        StrategyKind::NetworkFirst => {
            let mut strategy = NetworkFirst::new(core);
            if let Some(secs) = config.network_timeout_secs {
                strategy = strategy.with_network_timeout(Duration::from_secs(secs));
            }
            Arc::new(strategy)
        }
        StrategyKind::CacheFirst => Arc::new(CacheFirst::new(core)),
        StrategyKind::StaleWhileRevalidate => Arc::new(StaleWhileRevalidate::new(core)),
        StrategyKind::NetworkOnly => Arc::new(NetworkOnly::new(core)),
        StrategyKind::CacheOnly => Arc::new(CacheOnly::new(core)),
    };

    Ok(Route::new(axum::http::Method::GET, matcher, handler))
}

/// Edge handler: buffer, dispatch, degrade to passthrough.
async fn gateway_handler(
    State(state): State<GatewayState>,
    request: Request<Body>,
) -> impl IntoResponse {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = match state.origin.join(path_and_query) {
        Ok(url) => url,
        Err(error) => {
            tracing::error!(request_id = %request_id, %error, "Failed to build absolute URL");
            return (StatusCode::BAD_REQUEST, "Malformed request target").into_response();
        }
    };

    let gateway_request = GatewayRequest::new(parts.method, url, parts.headers, body_bytes);
    let event = RequestEvent::new(request_id.clone(), state.background.clone());

    tracing::debug!(
        request_id = %request_id,
        method = %gateway_request.method(),
        url = %gateway_request.cache_key(),
        "Dispatching request"
    );

    let outcome = state
        .router
        .dispatch(gateway_request.clone(), event)
        .await;
    metrics::record_request_duration(start);

    match outcome {
        Ok(Some(response)) => response.into_axum(),
        Ok(None) => passthrough(&state, gateway_request, &request_id).await,
        Err(error) => {
            tracing::error!(request_id = %request_id, %error, "Handler failed");
            let status = match error {
                GatewayError::NetworkFailure { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, "Request handling failed").into_response()
        }
    }
}

/// Forward an unhandled request to the origin, as if no gateway were there.
async fn passthrough(
    state: &GatewayState,
    request: GatewayRequest,
    request_id: &str,
) -> Response {
    tracing::debug!(
        request_id = %request_id,
        url = %request.cache_key(),
        "Passing request through to origin"
    );

    match state
        .passthrough
        .fetch(&request, &[], &RequestState::new())
        .await
    {
        Ok(response) => response.into_axum(),
        Err(error) => {
            tracing::error!(request_id = %request_id, %error, "Passthrough failed");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheTuning;

    fn config_with_route(strategy: StrategyKind) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            name: "test".into(),
            host: None,
            path_prefix: Some("/assets".into()),
            strategy,
            cache_name: "runtime".into(),
            network_timeout_secs: None,
        });
        config
    }

    #[tokio::test]
    async fn test_server_builds_from_config() {
        let mut config = config_with_route(StrategyKind::CacheFirst);
        config.storage.caches.push(CacheTuning {
            name: "runtime".into(),
            capacity_bytes: 1024,
        });
        assert!(HttpServer::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_route_without_condition_is_invalid() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            name: "broken".into(),
            host: None,
            path_prefix: None,
            strategy: StrategyKind::CacheOnly,
            cache_name: "runtime".into(),
            network_timeout_secs: None,
        });

        let err = HttpServer::new(config).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRoute(_)));
    }
}
