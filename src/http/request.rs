//! Request handling and transformation.
//!
//! # Responsibilities
//! - Buffer inbound requests into a cheap-to-clone value type
//! - Generate unique request IDs (UUID v4)
//! - Extract routing-relevant information (URL, method, headers)
//! - Prepare requests for forwarding upstream
//!
//! # Design Decisions
//! - Bodies are buffered once at the edge; everything downstream clones
//!   `Bytes` handles instead of re-reading streams
//! - The URL is absolute so the cache key and the scheme check need no
//!   out-of-band context

use axum::body::Body;
use axum::http::{header::HeaderValue, HeaderMap, Method, Request};
use bytes::Bytes;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// A buffered, owned HTTP request.
///
/// This is the value threaded through the router, the plugin hooks and both
/// wrappers. Cloning copies headers and bumps the body's refcount.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl GatewayRequest {
    /// Build a request from parts.
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Build a bodiless GET request for the given URL.
    ///
    /// This is the constructor cache-key plugins use to re-key an operation
    /// by URL alone.
    pub fn get(url: &str) -> GatewayResult<Self> {
        let url = Url::parse(url).map_err(|e| GatewayError::MalformedRequest(e.to_string()))?;
        Ok(Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the URL, keeping method, headers and body.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = url;
        self
    }

    /// True when the URL uses a scheme the gateway can fetch.
    pub fn is_http_scheme(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// The string this request addresses the cache with.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }

    /// Cache key with the query string stripped, for `ignore_search` lookups.
    pub fn cache_key_ignoring_search(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.into()
    }

    /// Convert into an `http::Request` suitable for the upstream client.
    pub fn into_http(self) -> GatewayResult<Request<Body>> {
        Request::builder()
            .method(self.method)
            .uri(self.url.as_str())
            .body(Body::from(self.body))
            .map(|mut req| {
                *req.headers_mut() = self.headers;
                req
            })
            .map_err(|e| GatewayError::MalformedRequest(e.to_string()))
    }
}

/// Request-ID generator for the `SetRequestIdLayer` middleware.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_constructor() {
        let req = GatewayRequest::get("http://origin.local/assets/app.js").unwrap();
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.cache_key(), "http://origin.local/assets/app.js");
        assert!(req.is_http_scheme());
    }

    #[test]
    fn test_non_http_scheme() {
        let req = GatewayRequest::get("ftp://origin.local/file").unwrap();
        assert!(!req.is_http_scheme());
    }

    #[test]
    fn test_ignore_search_key() {
        let req = GatewayRequest::get("http://origin.local/list?page=2").unwrap();
        assert_eq!(req.cache_key_ignoring_search(), "http://origin.local/list");
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(GatewayRequest::get("not a url").is_err());
    }
}
