//! Hook registry: the fixed set of lifecycle hooks and their argument types.
//!
//! # Responsibilities
//! - Name every hook a plugin may implement
//! - Define the typed argument record each hook receives
//! - Distinguish cache-key derivation for reads from writes
//!
//! # Design Decisions
//! - The hook set is closed; plugins cannot add hooks
//! - Each argument record owns its data so hook futures are `'static`
//! - Chained hooks pass explicit values (`Option` for discard semantics)
//!   rather than relying on sentinel responses

use std::sync::Arc;

use crate::error::GatewayError;
use crate::http::request::GatewayRequest;
use crate::http::response::GatewayResponse;
use crate::plugins::state::RequestState;

/// Every lifecycle hook the pipeline can invoke, in no particular order.
///
/// Invocation order within one request is fixed by the wrappers; this enum
/// exists for logging and contract-violation reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    CacheKeyWillBeUsed,
    RequestWillFetch,
    FetchDidSucceed,
    FetchDidFail,
    CacheWillUpdate,
    CacheDidUpdate,
    CachedResponseWillBeUsed,
    HandlerWillStart,
    HandlerWillRespond,
    HandlerDidRespond,
    HandlerDidComplete,
}

impl HookName {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookName::CacheKeyWillBeUsed => "cache_key_will_be_used",
            HookName::RequestWillFetch => "request_will_fetch",
            HookName::FetchDidSucceed => "fetch_did_succeed",
            HookName::FetchDidFail => "fetch_did_fail",
            HookName::CacheWillUpdate => "cache_will_update",
            HookName::CacheDidUpdate => "cache_did_update",
            HookName::CachedResponseWillBeUsed => "cached_response_will_be_used",
            HookName::HandlerWillStart => "handler_will_start",
            HookName::HandlerWillRespond => "handler_will_respond",
            HookName::HandlerDidRespond => "handler_did_respond",
            HookName::HandlerDidComplete => "handler_did_complete",
        }
    }
}

impl std::fmt::Display for HookName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a cache key is being derived for a read or a write.
///
/// Passed to `cache_key_will_be_used` so plugins may key the two directions
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKeyMode {
    Read,
    Write,
}

/// Arguments to `cache_key_will_be_used`.
#[derive(Clone)]
pub struct CacheKeyArgs {
    pub mode: CacheKeyMode,
    pub request: GatewayRequest,
    pub state: RequestState,
}

/// Arguments to `request_will_fetch`.
#[derive(Clone)]
pub struct RequestWillFetchArgs {
    pub request: GatewayRequest,
    pub state: RequestState,
}

/// Arguments to `fetch_did_succeed`.
#[derive(Clone)]
pub struct FetchDidSucceedArgs {
    pub request: GatewayRequest,
    pub response: GatewayResponse,
    pub state: RequestState,
}

/// Arguments to `fetch_did_fail`.
///
/// `original_request` is the request before the `request_will_fetch` chain
/// ran; `request` is the one that actually went out.
#[derive(Clone)]
pub struct FetchDidFailArgs {
    pub original_request: GatewayRequest,
    pub request: GatewayRequest,
    pub error: Arc<GatewayError>,
    pub state: RequestState,
}

/// Arguments to `cache_will_update`.
#[derive(Clone)]
pub struct CacheWillUpdateArgs {
    pub request: GatewayRequest,
    pub response: GatewayResponse,
    pub state: RequestState,
}

/// Arguments to `cache_did_update`.
#[derive(Clone)]
pub struct CacheDidUpdateArgs {
    pub cache_name: String,
    pub request: GatewayRequest,
    pub old_response: Option<GatewayResponse>,
    pub new_response: GatewayResponse,
    pub state: RequestState,
}

/// Arguments to `cached_response_will_be_used`.
#[derive(Clone)]
pub struct CachedResponseArgs {
    pub cache_name: String,
    pub request: GatewayRequest,
    pub cached_response: Option<GatewayResponse>,
    pub state: RequestState,
}

/// Arguments to `handler_will_start`.
#[derive(Clone)]
pub struct HandlerWillStartArgs {
    pub request: GatewayRequest,
    pub state: RequestState,
}

/// Arguments to `handler_will_respond`.
#[derive(Clone)]
pub struct HandlerWillRespondArgs {
    pub request: GatewayRequest,
    pub response: GatewayResponse,
    pub state: RequestState,
}

/// Arguments to `handler_did_respond`.
#[derive(Clone)]
pub struct HandlerDidRespondArgs {
    pub request: GatewayRequest,
    pub response: Option<GatewayResponse>,
    pub state: RequestState,
}

/// Arguments to `handler_did_complete`.
#[derive(Clone)]
pub struct HandlerDidCompleteArgs {
    pub request: GatewayRequest,
    pub response: Option<GatewayResponse>,
    pub error: Option<Arc<GatewayError>>,
    pub state: RequestState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_names_are_stable() {
        assert_eq!(HookName::CacheWillUpdate.as_str(), "cache_will_update");
        assert_eq!(
            HookName::CachedResponseWillBeUsed.as_str(),
            "cached_response_will_be_used"
        );
    }
}
