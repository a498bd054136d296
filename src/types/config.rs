//! Configuration structures.
//!
//! Configuration is resolved once at process start from environment
//! variables and then passed by value to whatever needs it.

use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use super::errors::Result;

/// Global bridge configuration.
#[derive(Envconfig, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Observability configuration.
    #[envconfig(nested)]
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Event routing configuration.
    #[envconfig(nested)]
    #[serde(default)]
    pub events: EventsConfig,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::init_from_env()?)
    }

    /// Resolve configuration from an explicit variable map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Ok(Self::init_from_hashmap(vars)?)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Observability configuration.
#[derive(Envconfig, Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log line format (`text` or `json`).
    #[envconfig(from = "KUBE_EVENT_BRIDGE_LOG_FORMAT", default = "text")]
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Text,
        }
    }
}

/// Event routing configuration.
#[derive(Envconfig, Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Emit a debug line for every event dropped by an observation filter.
    /// Env: OSM_LOG_KUBERNETES_EVENTS
    #[envconfig(from = "OSM_LOG_KUBERNETES_EVENTS", default = "false")]
    pub log_kubernetes_events: bool,

    /// Comma separated namespaces whose resources are observed.
    /// Env: KUBE_EVENT_BRIDGE_MONITORED_NAMESPACES
    #[envconfig(from = "KUBE_EVENT_BRIDGE_MONITORED_NAMESPACES", default = "")]
    pub monitored_namespaces: String,
}

impl EventsConfig {
    /// Parsed set of monitored namespaces (trimmed, empties dropped).
    pub fn monitored_namespace_set(&self) -> BTreeSet<String> {
        self.monitored_namespaces
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect()
    }
}
