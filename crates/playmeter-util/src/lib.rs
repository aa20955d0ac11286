//! Shared utilities for playmeterd
//!
//! This crate provides:
//! - ID types (UnitId, PriceId, ItemId, OperatorId, ClientId)
//! - Money (whole-currency amounts)
//! - Time utilities (mockable wall clock, duration helpers)
//! - Default paths for socket, data, and config

mod ids;
mod money;
mod paths;
mod time;

pub use ids::*;
pub use money::*;
pub use paths::*;
pub use time::*;
