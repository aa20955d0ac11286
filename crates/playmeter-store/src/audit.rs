//! Audit event types

use chrono::{DateTime, Local};
use playmeter_util::{ItemId, Money, OperatorId, PriceId, UnitId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped { active_units: usize },

    /// Config reload requested
    ConfigReloaded { success: bool },

    SessionStarted {
        unit_id: UnitId,
        price_id: PriceId,
        operator_id: OperatorId,
        target_end: Option<DateTime<Local>>,
    },

    SessionExtended {
        unit_id: UnitId,
        price_id: PriceId,
        target_end: Option<DateTime<Local>>,
        current_amount: Money,
    },

    SessionStopped {
        unit_id: UnitId,
        total_bill: Money,
        duration_minutes: f64,
        auto: bool,
    },

    SessionTransferred {
        source: UnitId,
        destination: UnitId,
        faulty: bool,
    },

    FaultReset { unit_id: UnitId },

    OrderAdded {
        unit_id: UnitId,
        item_id: ItemId,
        quantity: u32,
        unit_price: Money,
    },

    OrdersDelivered { unit_id: UnitId },

    UnitRenamed { unit_id: UnitId, name: String },

    UnitsResized { from: u32, to: u32 },

    /// Relay controller link went up or down
    LinkStatusChanged {
        connected: bool,
        detail: Option<String>,
    },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: playmeter_util::now(),
            event,
        }
    }
}
