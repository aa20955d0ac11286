//! Validated settings structures

use crate::schema::{RawConfig, RawMenuItem, RawPrice, RawPriceKind, RawServiceConfig, RawUnits};
use playmeter_api::{PriceDefinition, PriceKind};
use playmeter_util::{ItemId, Money, PriceId, data_dir_without_env, socket_path_without_env};
use std::path::PathBuf;
use std::time::Duration;

/// Unit count used when the config has no `[units]` table
pub const DEFAULT_UNIT_COUNT: u32 = 10;

/// Upper bound on the fleet size
pub const MAX_UNIT_COUNT: u32 = 50;

/// Scheduler tick period used when none is configured
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Display name for a unit without a configured name
pub fn default_unit_name(unit: u32) -> String {
    format!("Unit {}", unit)
}

/// Validated settings ready for use by the billing engine
#[derive(Debug, Clone)]
pub struct Settings {
    pub service: ServiceConfig,
    pub units: UnitLayout,
    pub prices: Vec<PriceDefinition>,
    pub menu: Vec<MenuItem>,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            units: UnitLayout::from_raw(raw.units),
            prices: raw.prices.into_iter().map(convert_price).collect(),
            menu: raw.menu.into_iter().map(MenuItem::from_raw).collect(),
        }
    }

    pub fn get_price(&self, id: &PriceId) -> Option<&PriceDefinition> {
        self.prices.iter().find(|p| &p.id == id)
    }

    pub fn get_menu_item(&self, id: &ItemId) -> Option<&MenuItem> {
        self.menu.iter().find(|m| &m.id == id)
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    /// None means auto-detect a USB serial adapter
    pub device: Option<PathBuf>,
    pub tick_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(socket_path_without_env),
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            device: raw.device,
            tick_interval: raw
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: socket_path_without_env(),
            data_dir: data_dir_without_env(),
            device: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Unit count and one display name per unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLayout {
    pub count: u32,
    /// Always exactly `count` entries
    pub names: Vec<String>,
}

impl UnitLayout {
    /// Build a layout, filling in default names past the end of `names`
    pub fn new(count: u32, names: &[String]) -> Self {
        let names = (1..=count)
            .map(|n| {
                names
                    .get(n as usize - 1)
                    .cloned()
                    .unwrap_or_else(|| default_unit_name(n))
            })
            .collect();
        Self { count, names }
    }

    fn from_raw(raw: RawUnits) -> Self {
        Self::new(raw.count.unwrap_or(DEFAULT_UNIT_COUNT), &raw.names)
    }
}

impl Default for UnitLayout {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_COUNT, &[])
    }
}

/// Validated F&B menu item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: ItemId,
    pub name: String,
    pub price: Money,
    pub initial_stock: u32,
}

impl MenuItem {
    fn from_raw(raw: RawMenuItem) -> Self {
        Self {
            id: ItemId::new(raw.id),
            name: raw.name,
            price: Money::new(raw.price),
            initial_stock: raw.stock,
        }
    }
}

fn convert_price(raw: RawPrice) -> PriceDefinition {
    let kind = match raw.kind {
        RawPriceKind::Hourly { rate } => PriceKind::Hourly {
            rate: Money::new(rate),
        },
        RawPriceKind::Package {
            price,
            duration_minutes,
        } => PriceKind::Package {
            price: Money::new(price),
            duration_minutes,
        },
    };

    PriceDefinition {
        id: PriceId::new(raw.id),
        name: raw.name,
        kind,
    }
}
