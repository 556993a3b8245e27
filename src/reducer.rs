//! Reducer - the pure state transition every store is built from.

use std::sync::Arc;

use serde_json::Value;

/// A pure state transition: `(state, action) -> new state`.
///
/// `state` is `None` exactly once, when a container first invokes its
/// reducer to produce the initial state.
pub trait Reduce: Send + Sync {
    fn reduce(&self, state: Option<&Value>, action: &Value) -> Value;
}

impl<F> Reduce for F
where
    F: Fn(Option<&Value>, &Value) -> Value + Send + Sync,
{
    fn reduce(&self, state: Option<&Value>, action: &Value) -> Value {
        self(state, action)
    }
}

/// Shared handle to a reducer. Clones are cheap and refer to the same
/// underlying function.
pub type Reducer = Arc<dyn Reduce>;

/// Wrap a closure as a shareable [`Reducer`].
pub fn reducer_fn<F>(f: F) -> Reducer
where
    F: Fn(Option<&Value>, &Value) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}
