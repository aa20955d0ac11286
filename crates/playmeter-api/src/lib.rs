//! Shared types and IPC protocol for playmeterd
//!
//! This crate defines the stable API between playmeterd and its clients:
//! - Billing types (prices, F&B orders, unit status, ledger records)
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
