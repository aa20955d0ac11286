//! Store trait definitions

use playmeter_api::TransactionRecord;
use playmeter_util::ItemId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Ledger

    /// Append a completed-session record
    fn append_transaction(&self, record: &TransactionRecord) -> StoreResult<()>;

    /// Most recent ledger records, newest first
    fn recent_transactions(&self, limit: usize) -> StoreResult<Vec<TransactionRecord>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // F&B stock

    /// Create a stock counter if the item has none yet.
    /// Returns true if the counter was created.
    fn seed_stock(&self, item: &ItemId, quantity: u32) -> StoreResult<bool>;

    /// Current stock level, None if the item has no counter
    fn get_stock(&self, item: &ItemId) -> StoreResult<Option<u32>>;

    /// Take `quantity` units out of stock, returning what is left.
    /// Fails with `OutOfStock` without changing the counter if there is not enough.
    fn decrement_stock(&self, item: &ItemId, quantity: u32) -> StoreResult<u32>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
