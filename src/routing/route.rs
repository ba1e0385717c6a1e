//! Routes and handlers.
//!
//! # Responsibilities
//! - Bind a match condition, an HTTP method and a handler together
//! - Give every route an identity for unregistration
//! - Normalize plain async functions and handler objects to one shape
//!
//! # Design Decisions
//! - Routes are immutable once constructed; the router owns registration
//! - Identity is a process-wide counter, not structural equality

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use crate::error::{GatewayError, GatewayResult};
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::lifecycle::background::RequestEvent;
use crate::plugins::state::RequestState;
use crate::routing::matcher::{MatchParams, RouteMatcher};

/// Global atomic counter for route IDs.
/// Relaxed ordering is sufficient since we only need uniqueness.
static ROUTE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(u64);

impl RouteId {
    fn next() -> Self {
        Self(ROUTE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "route-{}", self.0)
    }
}

/// Everything a handler receives for one request.
#[derive(Clone)]
pub struct HandlerContext {
    pub request: GatewayRequest,
    /// Params produced by the winning matcher, already normalized.
    pub params: Option<MatchParams>,
    /// Per-request mutable state, shared with every plugin hook.
    pub state: RequestState,
    /// Host surface: request id and background-task anchoring.
    pub event: RequestEvent,
    /// Set only when a catch handler is being invoked.
    pub error: Option<Arc<GatewayError>>,
}

impl HandlerContext {
    /// A context for direct handler invocation outside the router.
    pub fn standalone(request: GatewayRequest) -> Self {
        Self {
            request,
            params: None,
            state: RequestState::new(),
            event: RequestEvent::detached(),
            error: None,
        }
    }
}

/// Anything that can turn a request into a response.
///
/// `Ok(None)` means the handler deliberately produced no response; the
/// caller decides what that falls back to.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>>;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = GatewayResult<Option<GatewayResponse>>> + Send,
{
    async fn handle(&self, cx: HandlerContext) -> GatewayResult<Option<GatewayResponse>> {
        (self.f)(cx).await
    }
}

/// Adapt a plain async function to the [`Handler`] shape.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<Option<GatewayResponse>>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// An immutable predicate + method + handler triple.
pub struct Route {
    id: RouteId,
    method: Method,
    matcher: Arc<dyn RouteMatcher>,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(
        method: Method,
        matcher: Arc<dyn RouteMatcher>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            id: RouteId::next(),
            method,
            matcher,
            handler,
        }
    }

    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn matcher(&self) -> &Arc<dyn RouteMatcher> {
        &self.matcher
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("matcher", &self.matcher)
            .finish()
    }
}
