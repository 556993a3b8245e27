mod binding;
mod container;
mod error;
mod reducer;
mod registry;

pub use binding::{BindingPhase, StateChange, StoreBinding, DEFAULT_STORE_NAME};
pub use container::{StateContainer, SubscriptionHandle, INIT_ACTION_TYPE};
pub use error::StoreError;
pub use reducer::{reducer_fn, Reduce, Reducer};
pub use registry::{CreationWaiter, RegistryEntry, StoreRegistry};
