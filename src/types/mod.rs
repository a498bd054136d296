//! Core types for the event bridge.
//!
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration resolved once from the environment

mod config;
mod errors;

pub use config::{Config, EventsConfig, LogFormat, ObservabilityConfig};
pub use errors::{Error, Result};
