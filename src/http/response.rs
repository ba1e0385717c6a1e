//! Response handling and transformation.
//!
//! # Responsibilities
//! - Buffer upstream responses into a cheap-to-clone value type
//! - Convert between the buffered form and axum's streaming form
//! - Map gateway errors to appropriate HTTP status codes at the edge
//!
//! # Design Decisions
//! - Bodies are buffered so a single response can be returned to the client
//!   and written to cache without re-reading a stream
//! - Cache-worthiness checks live in the cache wrapper, not here

use axum::body::Body;
use axum::http::{response::Parts, HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;

/// A buffered, owned HTTP response.
///
/// Cloning copies headers and bumps the body's refcount, which is what makes
/// "return to client and also write to cache" cheap.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl GatewayResponse {
    /// Build a response from parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Build from `http` response parts and an already-collected body.
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
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

    /// Replace the status code, keeping headers and body.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replace the body, keeping status and headers.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Convert into an axum response for the client.
    pub fn into_axum(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
