//! StateContainer - a reducer plus its current state and subscriber list.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{json, Value};

use crate::error::StoreError;
use crate::reducer::Reducer;

/// Action type dispatched once at creation so the reducer can produce its
/// initial state from a `None` previous state.
pub const INIT_ACTION_TYPE: &str = "@@INIT";

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

type Subscriber = Box<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`StateContainer::subscribe`]. Required to release
/// the subscription again via [`StateContainer::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: String,
}

impl SubscriptionHandle {
    /// The underlying listener id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A single-reducer state container: dispatch, state reads, and
/// subscribe/unsubscribe.
///
/// Clone-friendly via `Arc`: all clones share the same state and the same
/// subscriber list. Subscribers run synchronously, in subscription order,
/// after every completed dispatch, and receive the full new state snapshot.
/// Transitions that leave the state unchanged still notify; nothing is
/// deduplicated.
///
/// Dispatching or subscribing from inside a change listener is not
/// supported: the subscriber list is locked for the duration of the
/// fan-out.
///
/// ## Example
///
/// ```
/// use redux_store::{reducer_fn, StateContainer};
/// use serde_json::json;
///
/// let container = StateContainer::new(reducer_fn(|state, action| {
///     let count = state.and_then(|s| s["count"].as_i64()).unwrap_or(0);
///     match action["type"].as_str() {
///         Some("INCREMENT") => json!({ "count": count + 1 }),
///         _ => json!({ "count": count }),
///     }
/// }));
///
/// container.dispatch(&json!({ "type": "INCREMENT" })).unwrap();
/// assert_eq!(container.state().unwrap()["count"], 1);
/// ```
#[derive(Clone)]
pub struct StateContainer {
    state: Arc<RwLock<Value>>,
    reducer: Reducer,
    subscribers: Arc<RwLock<Vec<(String, Subscriber)>>>,
}

impl StateContainer {
    /// Create a container from a reducer. The initial state is whatever the
    /// reducer returns for `(None, { "type": "@@INIT" })`. No notification
    /// fires at creation.
    pub fn new(reducer: Reducer) -> Self {
        let initial = reducer.reduce(None, &json!({ "type": INIT_ACTION_TYPE }));
        StateContainer {
            state: Arc::new(RwLock::new(initial)),
            reducer,
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Clone of the current state.
    pub fn state(&self) -> Result<Value, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::LockPoisoned("state read"))?;
        Ok(state.clone())
    }

    /// Run the reducer against the current state, store the result, and
    /// notify every subscriber with the new snapshot.
    pub fn dispatch(&self, action: &Value) -> Result<(), StoreError> {
        let snapshot = {
            let mut state = self
                .state
                .write()
                .map_err(|_| StoreError::LockPoisoned("state write"))?;
            let next = self.reducer.reduce(Some(&state), action);
            *state = next;
            state.clone()
        };

        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| StoreError::LockPoisoned("subscribers read"))?;
        for (_, subscriber) in subscribers.iter() {
            subscriber(&snapshot);
        }
        Ok(())
    }

    /// Subscribe to state changes. The listener receives the full new state
    /// on every dispatch until the returned handle is passed to
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionHandle, StoreError>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = format!("listener-{}", NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| StoreError::LockPoisoned("subscribers write"))?;
        subscribers.push((id.clone(), Box::new(listener)));
        Ok(SubscriptionHandle { id })
    }

    /// Release a subscription. Returns `true` when a listener was removed,
    /// `false` when the handle was already released.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<bool, StoreError> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| StoreError::LockPoisoned("subscribers write"))?;
        let before = subscribers.len();
        subscribers.retain(|(id, _)| id != &handle.id);
        Ok(subscribers.len() < before)
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> Result<usize, StoreError> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| StoreError::LockPoisoned("subscribers read"))?;
        Ok(subscribers.len())
    }
}

impl fmt::Debug for StateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read().map(|s| s.clone()).unwrap_or(Value::Null);
        f.debug_struct("StateContainer").field("state", &state).finish()
    }
}
