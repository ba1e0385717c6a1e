//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Hold all registered routes per HTTP method
//! - Dispatch each request to the first matching route
//! - Fall back to the default handler, recover via the catch handler
//!
//! # Design Decisions
//! - Registration order is precedence order; dispatch stops at first match
//! - Effectively immutable after setup; mutation during concurrent
//!   dispatch is a caller error, not a supported operation
//! - Explicit `Ok(None)` for "no response" rather than a synthetic 404

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::Method;

use crate::error::{GatewayError, GatewayResult};
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::lifecycle::background::RequestEvent;
use crate::observability::metrics;
use crate::plugins::state::RequestState;
use crate::routing::matcher::MatchParams;
use crate::routing::route::{Handler, HandlerContext, Route, RouteId};

/// Dispatches requests to the first matching registered route.
#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<Method, Vec<Route>>>,
    default_handler: RwLock<Option<Arc<dyn Handler>>>,
    catch_handler: RwLock<Option<Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route to its method's sequence.
    ///
    /// Earlier registrations take precedence at dispatch time.
    pub fn register_route(&self, route: Route) -> GatewayResult<RouteId> {
        let mut routes = self.routes.write().expect("route table lock poisoned");
        let sequence = routes.entry(route.method().clone()).or_default();
        if sequence.iter().any(|existing| existing.id() == route.id()) {
            return Err(GatewayError::InvalidRoute(format!(
                "{} is already registered for {}",
                route.id(),
                route.method()
            )));
        }
        let id = route.id();
        tracing::debug!(route = %id, method = %route.method(), "Route registered");
        sequence.push(route);
        Ok(id)
    }

    /// Remove a route by identity.
    pub fn unregister_route(&self, method: &Method, id: RouteId) -> GatewayResult<()> {
        let mut routes = self.routes.write().expect("route table lock poisoned");
        let Some(sequence) = routes.get_mut(method) else {
            return Err(GatewayError::RouteNotFound {
                method: method.clone(),
                route_id: id.as_u64(),
            });
        };
        let Some(index) = sequence.iter().position(|route| route.id() == id) else {
            return Err(GatewayError::RouteNotFound {
                method: method.clone(),
                route_id: id.as_u64(),
            });
        };
        sequence.remove(index);
        tracing::debug!(route = %id, method = %method, "Route unregistered");
        Ok(())
    }

    /// Handler for requests no route matches.
    pub fn set_default_handler(&self, handler: Arc<dyn Handler>) {
        *self
            .default_handler
            .write()
            .expect("default handler lock poisoned") = Some(handler);
    }

    /// Handler invoked when a matched handler fails.
    pub fn set_catch_handler(&self, handler: Arc<dyn Handler>) {
        *self
            .catch_handler
            .write()
            .expect("catch handler lock poisoned") = Some(handler);
    }

    /// Route a request to a response.
    ///
    /// `Ok(None)` means the gateway declines to respond and the caller
    /// should fall back to passthrough.
    pub async fn dispatch(
        &self,
        request: GatewayRequest,
        event: RequestEvent,
    ) -> GatewayResult<Option<GatewayResponse>> {
        if !request.is_http_scheme() {
            tracing::debug!(
                url = %request.cache_key(),
                scheme = request.url().scheme(),
                "Ignoring non-http scheme"
            );
            return Ok(None);
        }

        let state = RequestState::new();
        let matched = self.find_handler_and_params(&request);

        let (handler, params) = match matched {
            Some((handler, params, route_id)) => {
                tracing::debug!(
                    request_id = event.request_id(),
                    route = %route_id,
                    url = %request.cache_key(),
                    "Route matched"
                );
                (handler, params)
            }
            None => {
                let default = self
                    .default_handler
                    .read()
                    .expect("default handler lock poisoned")
                    .clone();
                match default {
                    Some(handler) => {
                        tracing::debug!(
                            request_id = event.request_id(),
                            url = %request.cache_key(),
                            "No route matched, using default handler"
                        );
                        (handler, None)
                    }
                    None => {
                        metrics::record_dispatch("no-route");
                        tracing::debug!(
                            request_id = event.request_id(),
                            url = %request.cache_key(),
                            "No route matched and no default handler"
                        );
                        return Ok(None);
                    }
                }
            }
        };

        let cx = HandlerContext {
            request: request.clone(),
            params,
            state: state.clone(),
            event: event.clone(),
            error: None,
        };

        match handler.handle(cx).await {
            Ok(response) => {
                metrics::record_dispatch(if response.is_some() {
                    "handled"
                } else {
                    "no-response"
                });
                Ok(response)
            }
            Err(error) => {
                let catch = self
                    .catch_handler
                    .read()
                    .expect("catch handler lock poisoned")
                    .clone();
                match catch {
                    Some(catch) => {
                        tracing::debug!(
                            request_id = event.request_id(),
                            %error,
                            "Handler failed, falling back to catch handler"
                        );
                        metrics::record_dispatch("caught");
                        let cx = HandlerContext {
                            request,
                            params: None,
                            state,
                            event,
                            error: Some(Arc::new(error)),
                        };
                        catch.handle(cx).await
                    }
                    None => {
                        metrics::record_dispatch("failed");
                        Err(error)
                    }
                }
            }
        }
    }

    /// First matching route wins; returns its handler, normalized params
    /// and id. Lock is released before any handler runs.
    fn find_handler_and_params(
        &self,
        request: &GatewayRequest,
    ) -> Option<(Arc<dyn Handler>, Option<MatchParams>, RouteId)> {
        let routes = self.routes.read().expect("route table lock poisoned");
        let sequence = routes.get(request.method())?;
        for route in sequence {
            if let Some(params) = route.matcher().matches(request) {
                return Some((route.handler().clone(), params.normalized(), route.id()));
            }
        }
        None
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.routes.read().expect("route table lock poisoned");
        let count: usize = routes.values().map(Vec::len).sum();
        f.debug_struct("Router").field("routes", &count).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matcher::PathPrefixMatcher;
    use crate::routing::route::handler_fn;

    fn req(url: &str) -> GatewayRequest {
        GatewayRequest::get(url).unwrap()
    }

    fn fixed(body: &'static str) -> Arc<dyn Handler> {
        handler_fn(move |_| async move { Ok(Some(GatewayResponse::ok(body))) })
    }

    fn route(prefix: &str, body: &'static str) -> Route {
        Route::new(
            Method::GET,
            Arc::new(PathPrefixMatcher::new(prefix.to_string())),
            fixed(body),
        )
    }

    #[tokio::test]
    async fn test_earliest_registered_route_wins() {
        let router = Router::new();
        router.register_route(route("/api", "first")).unwrap();
        router.register_route(route("/api", "second")).unwrap();

        let response = router
            .dispatch(req("http://o.local/api/v1"), RequestEvent::detached())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.body().as_ref(), b"first");
    }

    #[tokio::test]
    async fn test_no_match_without_default_is_no_response() {
        let router = Router::new();
        router.register_route(route("/api", "api")).unwrap();

        let response = router
            .dispatch(req("http://o.local/other"), RequestEvent::detached())
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_default_handler_catches_unmatched() {
        let router = Router::new();
        router.set_default_handler(fixed("default"));

        let response = router
            .dispatch(req("http://o.local/any"), RequestEvent::detached())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.body().as_ref(), b"default");
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_rejected_before_matching() {
        let router = Router::new();
        router.set_default_handler(fixed("default"));

        let response = router
            .dispatch(req("ftp://o.local/file"), RequestEvent::detached())
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_unregister_missing_route_fails() {
        let router = Router::new();

        // No sequence for the method at all.
        let orphan = route("/a", "x");
        let err = router
            .unregister_route(&Method::GET, orphan.id())
            .unwrap_err();
        assert!(matches!(err, GatewayError::RouteNotFound { .. }));

        // Sequence exists but the id is not in it.
        router.register_route(route("/b", "y")).unwrap();
        let err = router
            .unregister_route(&Method::GET, orphan.id())
            .unwrap_err();
        assert!(matches!(err, GatewayError::RouteNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unregister_then_next_route_matches() {
        let router = Router::new();
        let first_id = router.register_route(route("/api", "first")).unwrap();
        router.register_route(route("/api", "second")).unwrap();

        router.unregister_route(&Method::GET, first_id).unwrap();

        let response = router
            .dispatch(req("http://o.local/api/v1"), RequestEvent::detached())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.body().as_ref(), b"second");
    }

    #[tokio::test]
    async fn test_catch_handler_replaces_handler_error() {
        let router = Router::new();
        let failing = handler_fn(|_| async {
            Err(GatewayError::NetworkFailure {
                url: "http://o.local/api".into(),
                reason: "boom".into(),
            })
        });
        router
            .register_route(Route::new(
                Method::GET,
                Arc::new(PathPrefixMatcher::new("/api")),
                failing,
            ))
            .unwrap();
        router.set_catch_handler(handler_fn(|cx: HandlerContext| async move {
            assert!(cx.error.is_some());
            Ok(Some(GatewayResponse::ok("fallback")))
        }));

        let response = router
            .dispatch(req("http://o.local/api/v1"), RequestEvent::detached())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.body().as_ref(), b"fallback");
    }

    #[tokio::test]
    async fn test_handler_error_propagates_without_catch_handler() {
        let router = Router::new();
        let failing = handler_fn(|_| async {
            Err(GatewayError::NetworkFailure {
                url: "http://o.local/api".into(),
                reason: "boom".into(),
            })
        });
        router
            .register_route(Route::new(
                Method::GET,
                Arc::new(PathPrefixMatcher::new("/api")),
                failing,
            ))
            .unwrap();

        let err = router
            .dispatch(req("http://o.local/api/v1"), RequestEvent::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NetworkFailure { .. }));
    }

    #[tokio::test]
    async fn test_methods_are_isolated() {
        let router = Router::new();
        router.register_route(route("/api", "get")).unwrap();

        let head = GatewayRequest::new(
            Method::HEAD,
            url::Url::parse("http://o.local/api/v1").unwrap(),
            Default::default(),
            axum::body::Bytes::new(),
        );
        let response = router
            .dispatch(head, RequestEvent::detached())
            .await
            .unwrap();
        assert!(response.is_none());
    }
}
