//! StoreRegistry - process-wide mapping from store name to exactly one container.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use crate::container::StateContainer;
use crate::error::StoreError;
use crate::reducer::Reducer;

/// One-shot callback invoked when a named container becomes available.
pub type CreationWaiter = Box<dyn FnOnce() + Send>;

/// One registry entry: the shared container for a name and the reducer it
/// was created from. The reducer reference is immutable after creation;
/// later declarations against the same name are discarded.
#[derive(Clone)]
pub struct RegistryEntry {
    pub container: StateContainer,
    pub reducer: Reducer,
}

/// Registry of named, reducer-driven state containers.
///
/// A container is created lazily, the first time a reducer is declared for
/// its name, and exactly once per name: re-declaring a reducer for an
/// existing name is a no-op and the container keeps its accumulated state.
/// Entries are only ever inserted, never removed or replaced.
///
/// Clone-friendly via `Arc`: clones share one underlying registry. There
/// is no hidden global; construct one registry per process (or per test,
/// for isolation) and hand clones to every caller.
///
/// ## Example
///
/// ```
/// use redux_store::{reducer_fn, StoreRegistry};
/// use serde_json::json;
///
/// let registry = StoreRegistry::new();
/// let counter = reducer_fn(|state, action| {
///     let count = state.and_then(|s| s["count"].as_i64()).unwrap_or(0);
///     match action["type"].as_str() {
///         Some("INCREMENT") => json!({ "count": count + 1 }),
///         _ => json!({ "count": count }),
///     }
/// });
///
/// registry.ensure_container("COUNTER", counter).unwrap();
/// registry.dispatch("COUNTER", &json!({ "type": "INCREMENT" })).unwrap();
/// assert_eq!(registry.state("COUNTER").unwrap()["count"], 1);
/// ```
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: Arc<RwLock<HashMap<String, RegistryEntry>>>,
    // Waiters for names with no container yet, drained on creation.
    // Lock order: `stores` is never held while acquiring `waiters`.
    waiters: Arc<Mutex<HashMap<String, Vec<CreationWaiter>>>>,
}

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        StoreRegistry {
            stores: Arc::new(RwLock::new(HashMap::new())),
            waiters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create the container for `name` from `reducer`, unless one already
    /// exists, in which case the existing container and its accumulated
    /// state are preserved and the supplied reducer is discarded. A
    /// reducer/name pair may become known in either order and be re-asserted
    /// any number of times, so creation is idempotent by name.
    ///
    /// When a container is actually created, every waiter registered for
    /// the name via [`notify_on_create`](Self::notify_on_create) is invoked,
    /// after all registry locks are released.
    pub fn ensure_container(&self, name: &str, reducer: Reducer) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidStoreName);
        }

        let created = {
            let mut stores = self
                .stores
                .write()
                .map_err(|_| StoreError::LockPoisoned("stores write"))?;
            match stores.entry(name.to_string()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(RegistryEntry {
                        container: StateContainer::new(Arc::clone(&reducer)),
                        reducer,
                    });
                    true
                }
            }
        };

        if created {
            self.wake_waiters(name)?;
        }
        Ok(())
    }

    /// Pure lookup; never creates.
    pub fn get(&self, name: &str) -> Result<Option<StateContainer>, StoreError> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::LockPoisoned("stores read"))?;
        Ok(stores.get(name).map(|entry| entry.container.clone()))
    }

    /// Whether a container exists for `name`.
    pub fn contains(&self, name: &str) -> Result<bool, StoreError> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::LockPoisoned("stores read"))?;
        Ok(stores.contains_key(name))
    }

    /// Number of containers created so far.
    pub fn len(&self) -> Result<usize, StoreError> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::LockPoisoned("stores read"))?;
        Ok(stores.len())
    }

    /// Whether no container has been created yet.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Forward `action` to the container registered under `name`. Any
    /// caller may dispatch against any existing name; dispatch and
    /// subscription are independent.
    pub fn dispatch(&self, name: &str, action: &Value) -> Result<(), StoreError> {
        let container = self.get(name)?.ok_or_else(|| StoreError::NoSuchStore {
            name: name.to_string(),
        })?;
        container.dispatch(action)
    }

    /// Current state of the container registered under `name`.
    pub fn state(&self, name: &str) -> Result<Value, StoreError> {
        let container = self.get(name)?.ok_or_else(|| StoreError::NoSuchStore {
            name: name.to_string(),
        })?;
        container.state()
    }

    /// Read-only snapshot of every entry, for introspection and testing.
    pub fn all(&self) -> Result<HashMap<String, RegistryEntry>, StoreError> {
        let stores = self
            .stores
            .read()
            .map_err(|_| StoreError::LockPoisoned("stores read"))?;
        Ok(stores.clone())
    }

    /// Register a one-shot waiter for `name`. Invoked immediately when the
    /// container already exists, otherwise once when it is created. Waiters
    /// for names that are never created are held until process end.
    pub fn notify_on_create(&self, name: &str, waiter: CreationWaiter) -> Result<(), StoreError> {
        {
            let mut waiters = self
                .waiters
                .lock()
                .map_err(|_| StoreError::LockPoisoned("waiters"))?;
            if !self.contains(name)? {
                waiters.entry(name.to_string()).or_default().push(waiter);
                return Ok(());
            }
        }
        waiter();
        Ok(())
    }

    fn wake_waiters(&self, name: &str) -> Result<(), StoreError> {
        let pending = {
            let mut waiters = self
                .waiters
                .lock()
                .map_err(|_| StoreError::LockPoisoned("waiters"))?;
            waiters.remove(name)
        };
        if let Some(pending) = pending {
            for waiter in pending {
                waiter();
            }
        }
        Ok(())
    }
}
