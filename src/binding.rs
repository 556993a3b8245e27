//! StoreBinding - per-caller binding protocol around the registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::SubscriptionHandle;
use crate::error::StoreError;
use crate::reducer::Reducer;
use crate::registry::StoreRegistry;

/// Reserved name used by every binding that never declares an explicit
/// store name. Callers that all omit a name share this store.
pub const DEFAULT_STORE_NAME: &str = "DEFAULT_STORE";

static NEXT_BINDING_ID: AtomicU64 = AtomicU64::new(0);

/// State snapshot delivered to change listeners after every dispatch
/// against the bound store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub store_name: String,
    pub state: Value,
}

type ChangeListener = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Where a binding currently is in its attach lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingPhase {
    /// Never activated.
    Unbound,
    /// Activated, waiting for the container to be created.
    Pending,
    /// Subscribed to the container's change notifications.
    Attached,
    /// Deactivated; no notifications are delivered.
    Detached,
}

enum Attachment {
    Unbound,
    Pending,
    Attached {
        store_name: String,
        handle: SubscriptionHandle,
    },
    Detached,
}

struct BindingInner {
    reducer: Option<Reducer>,
    store_name: String,
    active: bool,
    attachment: Attachment,
    listeners: Vec<ChangeListener>,
}

impl BindingInner {
    fn phase(&self) -> BindingPhase {
        match self.attachment {
            Attachment::Unbound => BindingPhase::Unbound,
            Attachment::Pending => BindingPhase::Pending,
            Attachment::Attached { .. } => BindingPhase::Attached,
            Attachment::Detached => BindingPhase::Detached,
        }
    }
}

/// One caller's binding to a named store.
///
/// A binding declares a reducer and a store name, in either order and any
/// number of times; the shared container is created as soon as a
/// reducer is known. Activation attaches the binding to the container's
/// change notifications, waiting for the container to be created when
/// necessary; deactivation releases the subscription. Every caller that
/// declares the same name shares the same container.
///
/// Bindings never outlive their subscription: dropping a binding releases
/// it the same way [`on_deactivate`](Self::on_deactivate) does.
///
/// ## Example
///
/// ```
/// use redux_store::{reducer_fn, StoreBinding, StoreRegistry};
/// use serde_json::json;
///
/// let registry = StoreRegistry::new();
/// let binding = StoreBinding::new(&registry);
/// binding.declare_store_name("APP").unwrap();
/// binding
///     .declare_reducer(reducer_fn(|state, _action| {
///         state.cloned().unwrap_or_else(|| json!({ "ready": true }))
///     }))
///     .unwrap();
/// binding.on_activate().unwrap();
///
/// assert_eq!(binding.current_state().unwrap()["ready"], true);
/// ```
pub struct StoreBinding {
    id: String,
    registry: StoreRegistry,
    inner: Arc<Mutex<BindingInner>>,
}

impl StoreBinding {
    /// Create a binding against `registry`. The declared name starts out as
    /// [`DEFAULT_STORE_NAME`] and no reducer is declared.
    pub fn new(registry: &StoreRegistry) -> Self {
        let id = NEXT_BINDING_ID.fetch_add(1, Ordering::Relaxed);
        StoreBinding {
            id: format!("store-binding-{}", id),
            registry: registry.clone(),
            inner: Arc::new(Mutex::new(BindingInner {
                reducer: None,
                store_name: DEFAULT_STORE_NAME.to_string(),
                active: false,
                attachment: Attachment::Unbound,
                listeners: Vec::new(),
            })),
        }
    }

    /// Process-unique id of this binding.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The currently declared store name.
    pub fn store_name(&self) -> Result<String, StoreError> {
        Ok(lock(&self.inner)?.store_name.clone())
    }

    /// The currently declared reducer, if any.
    pub fn reducer(&self) -> Result<Option<Reducer>, StoreError> {
        Ok(lock(&self.inner)?.reducer.clone())
    }

    /// Current phase of the attach lifecycle.
    pub fn phase(&self) -> Result<BindingPhase, StoreError> {
        Ok(lock(&self.inner)?.phase())
    }

    /// Declare the reducer for the bound store and create the container if
    /// it does not exist yet. Declaring against an existing container is a
    /// no-op; the container keeps its state and its original reducer.
    pub fn declare_reducer(&self, reducer: Reducer) -> Result<(), StoreError> {
        lock(&self.inner)?.reducer = Some(reducer);
        self.ensure_container()?;
        let active = lock(&self.inner)?.active;
        if active {
            try_attach(&self.registry, &self.inner)?;
        }
        Ok(())
    }

    /// Declare the store name. Renaming an attached binding detaches it
    /// from the old container and re-enters the attach cycle against the
    /// new name; the existing containers themselves are unaffected.
    pub fn declare_store_name(&self, name: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidStoreName);
        }

        let mut stale: Option<(String, SubscriptionHandle)> = None;
        let active;
        {
            let mut guard = lock(&self.inner)?;
            if guard.store_name != name {
                if matches!(guard.attachment, Attachment::Attached { .. }) {
                    if let Attachment::Attached { store_name, handle } =
                        std::mem::replace(&mut guard.attachment, Attachment::Pending)
                    {
                        stale = Some((store_name, handle));
                    }
                }
                guard.store_name = name.to_string();
            }
            active = guard.active;
        }

        if let Some((old_name, handle)) = stale {
            if let Some(container) = self.registry.get(&old_name)? {
                container.unsubscribe(&handle)?;
            }
        }

        self.ensure_container()?;
        if active {
            try_attach(&self.registry, &self.inner)?;
        }
        Ok(())
    }

    fn ensure_container(&self) -> Result<(), StoreError> {
        let declared = {
            let guard = lock(&self.inner)?;
            guard
                .reducer
                .clone()
                .map(|reducer| (guard.store_name.clone(), reducer))
        };
        match declared {
            Some((name, reducer)) => self.registry.ensure_container(&name, reducer),
            None => Ok(()),
        }
    }

    /// Dispatch an action against the bound store. Fails with
    /// [`StoreError::NoSuchStore`] while no container exists for the
    /// declared name. Dispatch is independent of attachment: a binding can
    /// drive a store it never subscribes to.
    pub fn dispatch_action(&self, action: &Value) -> Result<(), StoreError> {
        let name = self.store_name()?;
        self.registry.dispatch(&name, action)
    }

    /// Dispatch an action supplied as raw JSON text, as delivered by the
    /// attribute wiring of an embedding component framework.
    pub fn dispatch_json(&self, raw: &str) -> Result<(), StoreError> {
        let action: Value =
            serde_json::from_str(raw).map_err(|e| StoreError::Serde(e.to_string()))?;
        self.dispatch_action(&action)
    }

    /// Full current state of the bound store.
    pub fn current_state(&self) -> Result<Value, StoreError> {
        let name = self.store_name()?;
        self.registry.state(&name)
    }

    /// Register a listener for [`StateChange`] notifications. Listeners
    /// fire on every dispatch against the bound store while the binding is
    /// attached; the first notification a listener observes is caused by
    /// the first dispatch after attachment.
    pub fn on_state_change<F>(&self, listener: F) -> Result<(), StoreError>
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        lock(&self.inner)?.listeners.push(Arc::new(listener));
        Ok(())
    }

    /// Activate the binding and start the attach cycle.
    ///
    /// Attaches immediately when the container already exists; otherwise
    /// the binding stays [`BindingPhase::Pending`] and attaches as soon as
    /// any caller creates the container. Activating an attached binding is
    /// a no-op: a binding holds at most one subscription.
    pub fn on_activate(&self) -> Result<BindingPhase, StoreError> {
        {
            let mut guard = lock(&self.inner)?;
            guard.active = true;
            if matches!(guard.attachment, Attachment::Detached) {
                guard.attachment = Attachment::Unbound;
            }
        }
        try_attach(&self.registry, &self.inner)
    }

    /// Deactivate the binding and release its subscription, if any. No
    /// further notifications are delivered; a later
    /// [`on_activate`](Self::on_activate) re-enters the cycle cleanly.
    pub fn on_deactivate(&self) -> Result<(), StoreError> {
        let released = {
            let mut guard = lock(&self.inner)?;
            guard.active = false;
            match std::mem::replace(&mut guard.attachment, Attachment::Detached) {
                Attachment::Attached { store_name, handle } => Some((store_name, handle)),
                _ => None,
            }
        };

        if let Some((name, handle)) = released {
            if let Some(container) = self.registry.get(&name)? {
                container.unsubscribe(&handle)?;
            }
        }
        Ok(())
    }
}

impl Drop for StoreBinding {
    fn drop(&mut self) {
        let _ = self.on_deactivate();
    }
}

fn lock(inner: &Arc<Mutex<BindingInner>>) -> Result<MutexGuard<'_, BindingInner>, StoreError> {
    inner.lock().map_err(|_| StoreError::LockPoisoned("binding"))
}

/// One attach attempt. Safe to run arbitrarily many times: re-checks
/// container existence against the currently declared name, re-registers a
/// creation waiter when the container is still absent, and no-ops for
/// inactive or already-attached bindings.
fn try_attach(
    registry: &StoreRegistry,
    inner: &Arc<Mutex<BindingInner>>,
) -> Result<BindingPhase, StoreError> {
    let store_name = {
        let guard = lock(inner)?;
        if !guard.active {
            return Ok(guard.phase());
        }
        if matches!(guard.attachment, Attachment::Attached { .. }) {
            return Ok(BindingPhase::Attached);
        }
        guard.store_name.clone()
    };

    let container = match registry.get(&store_name)? {
        Some(container) => container,
        None => {
            lock(inner)?.attachment = Attachment::Pending;
            let registry_for_wake = registry.clone();
            let inner_for_wake = Arc::downgrade(inner);
            registry.notify_on_create(
                &store_name,
                Box::new(move || {
                    if let Some(inner) = inner_for_wake.upgrade() {
                        let _ = try_attach(&registry_for_wake, &inner);
                    }
                }),
            )?;
            return Ok(BindingPhase::Pending);
        }
    };

    let subscriber_inner = Arc::downgrade(inner);
    let subscribed_name = store_name.clone();
    let handle = container.subscribe(move |snapshot| {
        forward_snapshot(&subscriber_inner, &subscribed_name, snapshot);
    })?;

    let mut guard = lock(inner)?;
    if !guard.active {
        // Deactivated between the existence check and the subscribe call.
        drop(guard);
        container.unsubscribe(&handle)?;
        return Ok(BindingPhase::Detached);
    }
    if matches!(guard.attachment, Attachment::Attached { .. }) {
        // Another attach attempt won the race; keep its subscription.
        drop(guard);
        container.unsubscribe(&handle)?;
        return Ok(BindingPhase::Attached);
    }
    guard.attachment = Attachment::Attached { store_name, handle };
    Ok(BindingPhase::Attached)
}

fn forward_snapshot(inner: &Weak<Mutex<BindingInner>>, store_name: &str, snapshot: &Value) {
    let inner = match inner.upgrade() {
        Some(inner) => inner,
        None => return,
    };
    let listeners = {
        let guard = match inner.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if !guard.active {
            return;
        }
        guard.listeners.clone()
    };
    if listeners.is_empty() {
        return;
    }
    let change = StateChange {
        store_name: store_name.to_string(),
        state: snapshot.clone(),
    };
    for listener in &listeners {
        listener(&change);
    }
}
