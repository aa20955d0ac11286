//! Billing engine and unit session state machine for playmeterd
//!
//! This crate is the heart of playmeterd, containing:
//! - Pricing rules (hourly accrual, prepaid packages, extensions)
//! - Unit session state machine (Idle -> RunningTimer/RunningOpen -> Idle, Trouble)
//! - Session store sized to the unit fleet
//! - Scheduler tick (accrual and auto-stop on expiry)
//! - Session transfer between units

mod engine;
mod error;
mod events;
pub mod pricing;
mod scheduler;
mod session;
mod session_store;
mod transfer;

pub use engine::*;
pub use error::*;
pub use events::*;
pub use scheduler::*;
pub use session::*;
pub use session_store::*;
pub use transfer::*;
