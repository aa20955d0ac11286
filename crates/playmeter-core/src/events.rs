//! Core events emitted by the engine

use chrono::{DateTime, Local};
use playmeter_api::{EventPayload, TransactionRecord, UnitStatus};
use playmeter_util::{ItemId, Money, UnitId};

/// A relay power command implied by a billing change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCommand {
    pub unit: UnitId,
    pub on: bool,
}

impl RelayCommand {
    pub fn on(unit: UnitId) -> Self {
        Self { unit, on: true }
    }

    pub fn off(unit: UnitId) -> Self {
        Self { unit, on: false }
    }
}

/// Events emitted by the core engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    SessionStarted {
        unit_id: UnitId,
        unit_name: String,
        price_name: String,
        target_end: Option<DateTime<Local>>,
    },

    SessionExtended {
        unit_id: UnitId,
        target_end: Option<DateTime<Local>>,
        current_amount: Money,
    },

    /// Session completed; its record has been handed to the ledger
    SessionStopped {
        record: TransactionRecord,
        auto: bool,
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
        stock_left: u32,
    },

    OrdersDelivered {
        unit_id: UnitId,
    },

    UnitRenamed {
        unit_id: UnitId,
        name: String,
    },

    UnitsResized {
        from: u32,
        to: u32,
    },

    CatalogReloaded {
        price_count: usize,
        menu_count: usize,
    },
}

impl CoreEvent {
    /// Relay commands this event implies
    pub fn relay_commands(&self) -> Vec<RelayCommand> {
        match self {
            CoreEvent::SessionStarted { unit_id, .. } => vec![RelayCommand::on(*unit_id)],
            CoreEvent::SessionStopped { record, .. } => vec![RelayCommand::off(record.unit_id)],
            CoreEvent::FaultReset { unit_id } => vec![RelayCommand::off(*unit_id)],
            CoreEvent::SessionTransferred {
                source,
                destination,
                destination_status,
                ..
            } => {
                let mut commands = vec![RelayCommand::off(*source)];
                if destination_status.is_running() {
                    commands.push(RelayCommand::on(*destination));
                }
                commands
            }
            CoreEvent::SessionExtended { .. }
            | CoreEvent::OrderAdded { .. }
            | CoreEvent::OrdersDelivered { .. }
            | CoreEvent::UnitRenamed { .. }
            | CoreEvent::UnitsResized { .. }
            | CoreEvent::CatalogReloaded { .. } => Vec::new(),
        }
    }

    /// Client-facing form of this event
    pub fn to_payload(&self) -> EventPayload {
        match self.clone() {
            CoreEvent::SessionStarted {
                unit_id,
                unit_name,
                price_name,
                target_end,
            } => EventPayload::SessionStarted {
                unit_id,
                unit_name,
                price_name,
                target_end,
            },
            CoreEvent::SessionExtended {
                unit_id,
                target_end,
                current_amount,
            } => EventPayload::SessionExtended {
                unit_id,
                target_end,
                current_amount,
            },
            CoreEvent::SessionStopped {
                record,
                auto,
                needs_collection,
            } => EventPayload::SessionStopped {
                record,
                auto,
                needs_collection,
            },
            CoreEvent::SessionTransferred {
                source,
                destination,
                source_status,
                destination_status,
            } => EventPayload::SessionTransferred {
                source,
                destination,
                source_status,
                destination_status,
            },
            CoreEvent::FaultReset { unit_id } => EventPayload::FaultReset { unit_id },
            CoreEvent::OrderAdded {
                unit_id,
                item_id,
                name,
                quantity,
                ..
            } => EventPayload::OrderAdded {
                unit_id,
                item_id,
                name,
                quantity,
            },
            CoreEvent::OrdersDelivered { unit_id } => EventPayload::OrdersDelivered { unit_id },
            CoreEvent::UnitRenamed { unit_id, name } => EventPayload::UnitRenamed { unit_id, name },
            CoreEvent::UnitsResized { to, .. } => EventPayload::UnitsResized { count: to },
            CoreEvent::CatalogReloaded {
                price_count,
                menu_count,
            } => EventPayload::CatalogReloaded {
                price_count,
                menu_count,
            },
        }
    }
}
