//! Command types for the playmeterd protocol

use playmeter_util::{ClientId, ItemId, OperatorId, PriceId, UnitId};
use serde::{Deserialize, Serialize};

use crate::{
    FleetSnapshot, HealthStatus, MenuItemView, PriceDefinition, TransactionRecord, UnitView,
    API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    UnitNotFound,
    PriceNotFound,
    ItemNotFound,
    OutOfStock,
    InvalidQuantity,
    InvalidTransition,
    UnitNotActive,
    DestinationNotIdle,
    SourceIdle,
    SameUnit,
    ResizeWouldDropActive,
    PermissionDenied,
    ConfigError,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get a snapshot of every unit
    GetState,

    /// List the price catalog
    ListPrices,

    /// List the F&B menu with stock levels
    ListMenu,

    /// Start a session on an idle unit
    Start {
        unit: UnitId,
        price_id: PriceId,
        operator: OperatorId,
    },

    /// Add time (and charge) to a running session
    Extend { unit: UnitId, price_id: PriceId },

    /// Stop a running session and write it to the ledger
    Stop { unit: UnitId },

    /// Return a faulted unit to service
    ResetFault { unit: UnitId },

    /// Move a session to an idle unit
    Transfer {
        source: UnitId,
        destination: UnitId,
        /// Quarantine the source unit as faulted
        faulty: bool,
    },

    /// Order food or drinks for an active session
    AddOrder {
        unit: UnitId,
        item_id: ItemId,
        quantity: u32,
    },

    /// Mark every order on a unit as delivered
    MarkDelivered { unit: UnitId },

    /// Most recent ledger entries, newest first
    RecentTransactions { limit: usize },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    // Admin commands

    /// Rename a unit (admin only)
    RenameUnit { unit: UnitId, name: String },

    /// Change the number of units (admin only)
    ResizeUnits { count: u32, names: Vec<String> },

    /// Reload configuration (admin only)
    ReloadConfig,

    /// Ping for keepalive
    Ping,
}

impl Command {
    /// Commands that change the fleet layout or catalog
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::RenameUnit { .. } | Command::ResizeUnits { .. } | Command::ReloadConfig
        )
    }

    /// Commands that mutate billing state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Start { .. }
                | Command::Extend { .. }
                | Command::Stop { .. }
                | Command::ResetFault { .. }
                | Command::Transfer { .. }
                | Command::AddOrder { .. }
                | Command::MarkDelivered { .. }
        ) || self.requires_admin()
    }
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(FleetSnapshot),
    Prices(Vec<PriceDefinition>),
    Menu(Vec<MenuItemView>),
    /// Updated view of the unit a command acted on
    Unit(UnitView),
    Stopped {
        /// None when the unit had nothing to stop
        record: Option<TransactionRecord>,
        needs_collection: bool,
    },
    Transferred {
        source: UnitView,
        destination: UnitView,
    },
    UnitsResized {
        count: u32,
    },
    ConfigReloaded,
    Transactions(Vec<TransactionRecord>),
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = Request::new(
            1,
            Command::Start {
                unit: UnitId::new(3),
                price_id: PriceId::new("P1"),
                operator: OperatorId::new("staff"),
            },
        );
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"start\""));

        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, 1);
        assert_eq!(parsed.api_version, API_VERSION);
        match parsed.command {
            Command::Start { unit, price_id, .. } => {
                assert_eq!(unit, UnitId::new(3));
                assert_eq!(price_id.as_str(), "P1");
            }
            other => panic!("Expected Start, got {:?}", other),
        }
    }

    #[test]
    fn response_serialization() {
        let resp = Response::success(
            7,
            ResponsePayload::State(FleetSnapshot {
                api_version: API_VERSION,
                taken_at: playmeter_util::now(),
                units: vec![],
            }),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 7);
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::State(_))
        ));
    }

    #[test]
    fn error_response_serialization() {
        let resp = Response::error(2, ErrorInfo::new(ErrorCode::OutOfStock, "Mie Goreng"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("out_of_stock"));
    }

    #[test]
    fn admin_commands() {
        assert!(Command::ReloadConfig.requires_admin());
        assert!(
            Command::ResizeUnits {
                count: 5,
                names: vec![]
            }
            .requires_admin()
        );
        assert!(!Command::Stop { unit: UnitId::new(1) }.requires_admin());
        assert!(Command::Stop { unit: UnitId::new(1) }.is_mutation());
        assert!(!Command::GetState.is_mutation());
    }
}
