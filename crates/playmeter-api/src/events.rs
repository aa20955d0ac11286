//! Event types for playmeterd -> client streaming

use chrono::{DateTime, Local};
use playmeter_util::{ItemId, Money, UnitId};
use serde::{Deserialize, Serialize};

use crate::{FleetSnapshot, TransactionRecord, UnitStatus, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: playmeter_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full state snapshot (sent on subscribe and after layout changes)
    StateChanged(FleetSnapshot),

    SessionStarted {
        unit_id: UnitId,
        unit_name: String,
        price_name: String,
        /// None for open (hourly) sessions
        target_end: Option<DateTime<Local>>,
    },

    SessionExtended {
        unit_id: UnitId,
        target_end: Option<DateTime<Local>>,
        current_amount: Money,
    },

    /// Session completed and written to the ledger
    SessionStopped {
        record: TransactionRecord,
        /// Timer expiry rather than an operator stop
        auto: bool,
        /// Postpaid bill that staff still have to collect
        needs_collection: bool,
    },

    SessionTransferred {
        source: UnitId,
        destination: UnitId,
        source_status: UnitStatus,
        destination_status: UnitStatus,
    },

    FaultReset {
        unit_id: UnitId,
    },

    OrderAdded {
        unit_id: UnitId,
        item_id: ItemId,
        name: String,
        quantity: u32,
    },

    OrdersDelivered {
        unit_id: UnitId,
    },

    UnitRenamed {
        unit_id: UnitId,
        name: String,
    },

    UnitsResized {
        count: u32,
    },

    CatalogReloaded {
        price_count: usize,
        menu_count: usize,
    },

    /// Relay/status link went up or down
    LinkStatusChanged {
        connected: bool,
        detail: Option<String>,
    },

    /// Service is shutting down
    Shutdown,
}
