//! # Kube Event Bridge
//!
//! Turns Kubernetes watch notifications into announcements on an in-process
//! pub/sub bus:
//! - Add/update/delete callbacks built per watched kind, each tagged with its
//!   own announcement types
//! - Optional observation filter deciding which objects are in scope
//! - Optional debug logging of events the filter drops
//! - A fan-out bus that subscribers read announcements from
//!
//! ## Architecture
//!
//! ```text
//!   kube watcher ──► Informer ──► ResourceEventHandlerFuncs ──► Publisher (PubSub)
//!                   (old state)     filter → publish | log          │
//!                                                                   ▼
//!                                                             subscribers
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod announcements;
pub mod events;
pub mod kubernetes;
pub mod types;

// Internal utilities
pub mod observability;

pub use announcements::AnnouncementType;
pub use events::{PubSub, PubSubMessage, Publisher};
pub use types::{Config, Error, Result};
