//! Route matching logic.
//!
//! # Responsibilities
//! - Match request host (exact match, case-insensitive)
//! - Match URL path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//! - Carry match-derived params to the handler
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - A match is `Some(..)` regardless of params content; empty params are
//!   normalized away before the handler sees them

use std::collections::HashMap;

use crate::http::request::GatewayRequest;

/// Parameters produced by a successful match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchParams {
    /// Matched, nothing to pass along.
    None,
    /// Ordered positional values (e.g. path remainder segments).
    List(Vec<String>),
    /// Named values.
    Map(HashMap<String, String>),
}

impl MatchParams {
    /// Collapse empty params to "no params".
    ///
    /// Matching itself is expressed by the matcher returning `Some`; this
    /// only decides whether the handler receives a params value.
    pub fn normalized(self) -> Option<MatchParams> {
        match self {
            MatchParams::None => None,
            MatchParams::List(values) if values.is_empty() => None,
            MatchParams::Map(values) if values.is_empty() => None,
            params => Some(params),
        }
    }
}

/// Trait for matching requests against route conditions.
pub trait RouteMatcher: Send + Sync + std::fmt::Debug {
    /// `Some(params)` when the request matches this condition.
    fn matches(&self, request: &GatewayRequest) -> Option<MatchParams>;
}

/// Matches the request URL's host.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl RouteMatcher for HostMatcher {
    fn matches(&self, request: &GatewayRequest) -> Option<MatchParams> {
        let host = request.url().host_str()?;
        if host.to_lowercase() == self.expected_host {
            Some(MatchParams::None)
        } else {
            None
        }
    }
}

/// Matches the request URL's path prefix.
///
/// The path remainder after the prefix becomes a positional param when
/// non-empty.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl RouteMatcher for PathPrefixMatcher {
    fn matches(&self, request: &GatewayRequest) -> Option<MatchParams> {
        let path = request.url().path();
        let rest = path.strip_prefix(&self.prefix)?;
        if rest.is_empty() {
            Some(MatchParams::List(Vec::new()))
        } else {
            Some(MatchParams::List(vec![rest.to_string()]))
        }
    }
}

/// Combines multiple matchers with AND semantics.
///
/// Params from the last matcher that produced any are passed through.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn RouteMatcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn RouteMatcher>>) -> Self {
        Self { matchers }
    }
}

impl RouteMatcher for AndMatcher {
    fn matches(&self, request: &GatewayRequest) -> Option<MatchParams> {
        let mut params = MatchParams::None;
        for matcher in &self.matchers {
            let found = matcher.matches(request)?;
            if found.clone().normalized().is_some() {
                params = found;
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str) -> GatewayRequest {
        GatewayRequest::get(url).unwrap()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        assert!(matcher.matches(&req("http://example.com/a")).is_some());
        assert!(matcher.matches(&req("http://EXAMPLE.COM/a")).is_some()); // Case insensitive
        assert!(matcher.matches(&req("http://other.com/a")).is_none());
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        assert!(matcher.matches(&req("http://example.com/api/v1")).is_some());
        assert!(matcher.matches(&req("http://example.com/images")).is_none());
    }

    #[test]
    fn test_path_matcher_params() {
        let matcher = PathPrefixMatcher::new("/api");

        let exact = matcher.matches(&req("http://example.com/api")).unwrap();
        assert_eq!(exact.normalized(), None);

        let nested = matcher.matches(&req("http://example.com/api/v1")).unwrap();
        assert_eq!(
            nested.normalized(),
            Some(MatchParams::List(vec!["/v1".to_string()]))
        );
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(HostMatcher::new("example.com")),
            Box::new(PathPrefixMatcher::new("/api")),
        ]);

        assert!(matcher.matches(&req("http://example.com/api/v1")).is_some());
        assert!(matcher.matches(&req("http://other.com/api/v1")).is_none());
        assert!(matcher.matches(&req("http://example.com/web")).is_none());
    }

    #[test]
    fn test_empty_params_normalize_away() {
        assert_eq!(MatchParams::List(Vec::new()).normalized(), None);
        assert_eq!(MatchParams::Map(HashMap::new()).normalized(), None);
        assert_eq!(MatchParams::None.normalized(), None);

        let kept = MatchParams::List(vec!["x".into()]);
        assert_eq!(kept.clone().normalized(), Some(kept));
    }
}
