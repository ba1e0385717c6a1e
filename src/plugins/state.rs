//! Per-request mutable state shared across hook invocations.

use std::sync::{Arc, Mutex};

use axum::http::Extensions;

/// A typed key/value map created once per dispatched request and handed to
/// every hook invocation for that request.
///
/// Plugins use it to pass data between hooks, e.g. a timestamp recorded in
/// `handler_will_start` and read back in `handler_did_complete`. Values are
/// keyed by type; wrap domain values in a newtype to avoid collisions.
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    inner: Arc<Mutex<Extensions>>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.inner
            .lock()
            .expect("request state mutex poisoned")
            .insert(value)
    }

    /// Clone out the value of the given type, if present.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner
            .lock()
            .expect("request state mutex poisoned")
            .get::<T>()
            .cloned()
    }

    /// Remove and return the value of the given type.
    pub fn remove<T: Send + Sync + 'static>(&self) -> Option<T> {
        self.inner
            .lock()
            .expect("request state mutex poisoned")
            .remove::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn test_insert_get_remove() {
        let state = RequestState::new();
        assert!(state.get::<Marker>().is_none());

        state.insert(Marker(7));
        assert_eq!(state.get::<Marker>(), Some(Marker(7)));

        assert_eq!(state.remove::<Marker>(), Some(Marker(7)));
        assert!(state.get::<Marker>().is_none());
    }

    #[test]
    fn test_shared_between_clones() {
        let state = RequestState::new();
        let alias = state.clone();
        alias.insert(Marker(1));
        assert_eq!(state.get::<Marker>(), Some(Marker(1)));
    }
}
