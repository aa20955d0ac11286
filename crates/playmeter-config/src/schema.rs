//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Unit fleet layout
    #[serde(default)]
    pub units: RawUnits,

    /// Price catalog
    #[serde(default)]
    pub prices: Vec<RawPrice>,

    /// F&B menu
    #[serde(default)]
    pub menu: Vec<RawMenuItem>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the SQLite store
    pub data_dir: Option<PathBuf>,

    /// Serial device for the relay controller (auto-detect if absent)
    pub device: Option<PathBuf>,

    /// Scheduler tick period
    pub tick_interval_ms: Option<u64>,
}

/// Unit fleet layout
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawUnits {
    pub count: Option<u32>,

    /// Display names by position; missing entries get a default name
    #[serde(default)]
    pub names: Vec<String>,
}

/// Raw price definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPrice {
    pub id: String,
    pub name: String,
    pub kind: RawPriceKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPriceKind {
    Hourly { rate: i64 },
    Package { price: i64, duration_minutes: u32 },
}

/// Raw F&B menu item
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMenuItem {
    pub id: String,
    pub name: String,
    pub price: i64,
    /// Initial stock, used only when the store has no counter for the item yet
    #[serde(default)]
    pub stock: u32,
}
