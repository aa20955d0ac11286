//! Shared types for the playmeterd API

use chrono::{DateTime, Local};
use playmeter_util::{ClientId, ItemId, Money, OperatorId, PriceId, UnitId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a price definition bills a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceKind {
    /// Postpaid: billed per started hour
    Hourly { rate: Money },
    /// Prepaid: fixed price for a fixed duration, charged up front
    Package { price: Money, duration_minutes: u32 },
}

/// A price definition from the catalog.
///
/// Sessions keep their own clone, so catalog edits never reach a running
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDefinition {
    pub id: PriceId,
    pub name: String,
    pub kind: PriceKind,
}

impl PriceDefinition {
    pub fn hourly(id: impl Into<PriceId>, name: impl Into<String>, rate: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PriceKind::Hourly {
                rate: Money::new(rate),
            },
        }
    }

    pub fn package(
        id: impl Into<PriceId>,
        name: impl Into<String>,
        price: i64,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: PriceKind::Package {
                price: Money::new(price),
                duration_minutes,
            },
        }
    }

    /// Postpaid prices leave the bill open until the session stops
    pub fn is_postpaid(&self) -> bool {
        matches!(self.kind, PriceKind::Hourly { .. })
    }

    /// Human-readable label for menus and logs
    pub fn label(&self) -> String {
        match self.kind {
            PriceKind::Hourly { rate } => format!("{} (Rp {} / hour)", self.name, rate),
            PriceKind::Package {
                price,
                duration_minutes,
            } => format!("{} (Rp {} / {} min)", self.name, price, duration_minutes),
        }
    }
}

/// A food & beverage order attached to a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnbOrder {
    pub item_id: ItemId,
    pub name: String,
    /// Price snapshot at order time
    pub unit_price: Money,
    pub quantity: u32,
    pub delivered: bool,
}

impl FnbOrder {
    pub fn total(&self) -> Money {
        self.unit_price
            .checked_mul(u64::from(self.quantity))
            .unwrap_or(Money::new(i64::MAX))
    }
}

/// Unit status, serialized with the exact tags used on the hardware link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Idle,
    RunningTimer,
    RunningOpen,
    Trouble,
}

impl UnitStatus {
    /// Wire tag for the status frame
    pub fn tag(self) -> &'static str {
        match self {
            UnitStatus::Idle => "IDLE",
            UnitStatus::RunningTimer => "RUNNING_TIMER",
            UnitStatus::RunningOpen => "RUNNING_OPEN",
            UnitStatus::Trouble => "TROUBLE",
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, UnitStatus::RunningTimer | UnitStatus::RunningOpen)
    }
}

/// F&B menu entry with its live stock level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemView {
    pub item_id: ItemId,
    pub name: String,
    pub price: Money,
    /// None when the stock counter could not be read
    pub stock: Option<u32>,
}

/// Read-only view of one unit's session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitView {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub status: UnitStatus,
    pub price: Option<PriceDefinition>,
    pub operator_id: Option<OperatorId>,
    pub started_at: Option<DateTime<Local>>,
    pub target_end: Option<DateTime<Local>>,
    pub paused_remaining: Option<Duration>,
    /// Remaining countdown, frozen countdown, or elapsed time (None when idle)
    pub display_time: Option<Duration>,
    /// Accrued charge excluding F&B
    pub current_amount: Money,
    /// Accrued charge plus every order total
    pub total_bill: Money,
    pub orders: Vec<FnbOrder>,
    /// True if any order is still undelivered
    pub pending_delivery: bool,
}

/// Full fleet state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub api_version: u32,
    pub taken_at: DateTime<Local>,
    pub units: Vec<UnitView>,
}

/// Ledger record of one completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub timestamp: DateTime<Local>,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub operator_id: OperatorId,
    pub package_name: String,
    pub total_bill: Money,
    pub duration_minutes: f64,
    /// F&B summary: `name(qty)` joined by `;`
    pub notes: String,
    /// Stopped by timer expiry rather than by an operator
    pub auto_stop: bool,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Front-desk staff console - can run sessions and orders
    Staff,
    /// Local admin - can also rename/resize units and reload config
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_operate(&self) -> bool {
        matches!(self, ClientRole::Staff | ClientRole::Admin)
    }

    pub fn can_configure(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub link_connected: bool,
    pub store_ok: bool,
}
