//! Kubernetes side of the bridge.
//!
//! - [`event_handlers`]: builds the add/update/delete callbacks that publish
//!   watch notifications onto the bus
//! - [`filter`]: observation filters for monitored namespaces
//! - [`informer`]: feeds a `kube` watcher stream into those callbacks

pub mod event_handlers;
pub mod filter;
pub mod informer;

pub use event_handlers::{
    get_kubernetes_event_handlers, observe_all, EventKind, EventTypes, HasNamespace,
    ObserveFilter, ResourceEventHandler, ResourceEventHandlerFuncs,
};
pub use informer::{Informer, ObjectKey};
