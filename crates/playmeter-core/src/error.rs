//! Billing errors

use playmeter_api::{ErrorCode, UnitStatus};
use playmeter_util::{ItemId, PriceId, UnitId};
use thiserror::Error;

/// Errors returned by session and engine operations.
///
/// All of them are synchronous and leave the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Cannot {operation} unit {unit} while {status:?}")]
    InvalidTransition {
        unit: UnitId,
        status: UnitStatus,
        operation: &'static str,
    },

    #[error("Unit {0} has no active session")]
    UnitNotActive(UnitId),

    #[error("Destination unit {0} is not idle")]
    DestinationNotIdle(UnitId),

    #[error("Source unit {0} is idle")]
    SourceIdle(UnitId),

    #[error("Cannot transfer unit {0} to itself")]
    SameUnit(UnitId),

    #[error("Unit {0} not found")]
    UnitNotFound(UnitId),

    #[error("Price {0} not found")]
    PriceNotFound(PriceId),

    #[error("Menu item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Menu item {0} is out of stock")]
    OutOfStock(ItemId),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Invalid unit name: {0:?}")]
    InvalidName(String),

    #[error("Invalid unit count: {0}")]
    InvalidUnitCount(u32),

    #[error("Resize would drop active unit {0}")]
    ResizeWouldDropActive(UnitId),

    #[error("Amount overflow on unit {0}")]
    AmountOverflow(UnitId),

    #[error("Time overflow on unit {0}")]
    TimeOverflow(UnitId),

    #[error("Clock is before the start of the session on unit {0}")]
    ClockWentBackwards(UnitId),

    #[error("Store error: {0}")]
    Store(String),
}

impl BillingError {
    /// Protocol error code for IPC responses
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            BillingError::UnitNotActive(_) => ErrorCode::UnitNotActive,
            BillingError::DestinationNotIdle(_) => ErrorCode::DestinationNotIdle,
            BillingError::SourceIdle(_) => ErrorCode::SourceIdle,
            BillingError::SameUnit(_) => ErrorCode::SameUnit,
            BillingError::UnitNotFound(_) => ErrorCode::UnitNotFound,
            BillingError::PriceNotFound(_) => ErrorCode::PriceNotFound,
            BillingError::ItemNotFound(_) => ErrorCode::ItemNotFound,
            BillingError::OutOfStock(_) => ErrorCode::OutOfStock,
            BillingError::InvalidQuantity(_) => ErrorCode::InvalidQuantity,
            BillingError::InvalidName(_) | BillingError::InvalidUnitCount(_) => {
                ErrorCode::InvalidRequest
            }
            BillingError::ResizeWouldDropActive(_) => ErrorCode::ResizeWouldDropActive,
            BillingError::AmountOverflow(_)
            | BillingError::TimeOverflow(_)
            | BillingError::ClockWentBackwards(_) => ErrorCode::InternalError,
            BillingError::Store(_) => ErrorCode::StoreError,
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
