//! Variable observation.
//!
//! Named external variables ("datarefs" on the aircraft side, "LVars" on the
//! ground-ops side) are read through a [`VariableBackend`]. The
//! [`VariableObserver`] polls the subscribed ones and dispatches changes.

mod backend;
mod memory;
mod observer;
mod value;

pub use backend::{BackendError, SharedBackend, VariableBackend};
pub use memory::MemoryBackend;
pub use observer::{
    ChangeHandler, ObserverConfig, ObserverError, SubscriptionId, VariableChange,
    VariableObserver, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
pub use value::VarValue;
