//! SQLite-based store implementation

use chrono::{DateTime, Local};
use playmeter_api::TransactionRecord;
use playmeter_util::{ItemId, Money, OperatorId, UnitId};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Ledger of completed sessions (append-only)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                unit_id INTEGER NOT NULL,
                unit_name TEXT NOT NULL,
                operator_id TEXT NOT NULL,
                package_name TEXT NOT NULL,
                total_bill INTEGER NOT NULL,
                duration_minutes REAL NOT NULL,
                notes TEXT NOT NULL,
                auto_stop INTEGER NOT NULL DEFAULT 0
            );

            -- F&B stock counters
            CREATE TABLE IF NOT EXISTS stock (
                item_id TEXT PRIMARY KEY,
                quantity INTEGER NOT NULL CHECK (quantity >= 0)
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Local> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .unwrap_or_else(|_| playmeter_util::now())
}

impl Store for SqliteStore {
    fn append_transaction(&self, record: &TransactionRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO transactions
                (timestamp, unit_id, unit_name, operator_id, package_name,
                 total_bill, duration_minutes, notes, auto_stop)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.timestamp.to_rfc3339(),
                record.unit_id.get(),
                record.unit_name,
                record.operator_id.as_str(),
                record.package_name,
                record.total_bill.amount(),
                record.duration_minutes,
                record.notes,
                record.auto_stop,
            ],
        )?;

        debug!(
            unit_id = %record.unit_id,
            total_bill = %record.total_bill,
            "Transaction appended"
        );
        Ok(())
    }

    fn recent_transactions(&self, limit: usize) -> StoreResult<Vec<TransactionRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT timestamp, unit_id, unit_name, operator_id, package_name,
                   total_bill, duration_minutes, notes, auto_stop
            FROM transactions ORDER BY id DESC LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map([limit], |row| {
            let timestamp: String = row.get(0)?;
            Ok(TransactionRecord {
                timestamp: parse_timestamp(&timestamp),
                unit_id: UnitId::new(row.get(1)?),
                unit_name: row.get(2)?,
                operator_id: OperatorId::new(row.get::<_, String>(3)?),
                package_name: row.get(4)?,
                total_bill: Money::new(row.get(5)?),
                duration_minutes: row.get(6)?,
                notes: row.get(7)?,
                auto_stop: row.get(8)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp: parse_timestamp(&timestamp_str),
                event,
            });
        }

        Ok(events)
    }

    fn seed_stock(&self, item: &ItemId, quantity: u32) -> StoreResult<bool> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO stock (item_id, quantity) VALUES (?, ?)",
            params![item.as_str(), quantity],
        )?;

        if inserted > 0 {
            debug!(item_id = %item, quantity, "Stock counter seeded");
        }
        Ok(inserted > 0)
    }

    fn get_stock(&self, item: &ItemId) -> StoreResult<Option<u32>> {
        let conn = self.conn()?;

        let quantity: Option<u32> = conn
            .query_row(
                "SELECT quantity FROM stock WHERE item_id = ?",
                [item.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(quantity)
    }

    fn decrement_stock(&self, item: &ItemId, quantity: u32) -> StoreResult<u32> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE stock SET quantity = quantity - ?1 WHERE item_id = ?2 AND quantity >= ?1",
            params![quantity, item.as_str()],
        )?;

        let remaining: Option<u32> = conn
            .query_row(
                "SELECT quantity FROM stock WHERE item_id = ?",
                [item.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match (changed, remaining) {
            (_, None) => Err(StoreError::NotFound(item.to_string())),
            (0, Some(_)) => Err(StoreError::OutOfStock(item.to_string())),
            (_, Some(left)) => {
                debug!(item_id = %item, taken = quantity, left, "Stock decremented");
                Ok(left)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuditEventType;

    fn record(unit: u32, total: i64) -> TransactionRecord {
        TransactionRecord {
            timestamp: playmeter_util::now(),
            unit_id: UnitId::new(unit),
            unit_name: format!("Unit {}", unit),
            operator_id: OperatorId::new("staff"),
            package_name: "Open PS3".into(),
            total_bill: Money::new(total),
            duration_minutes: 61.0,
            notes: "Mie Goreng(2)".into(),
            auto_stop: false,
        }
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::FaultReset {
                unit_id: UnitId::new(4),
            }))
            .unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::FaultReset { .. }));
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));
    }

    #[test]
    fn test_ledger_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        store.append_transaction(&record(1, 28000)).unwrap();
        store.append_transaction(&record(2, 20000)).unwrap();
        store.append_transaction(&record(3, 4000)).unwrap();

        let records = store.recent_transactions(2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].unit_id, UnitId::new(3));
        assert_eq!(records[1].unit_id, UnitId::new(2));
        assert_eq!(records[1].total_bill, Money::new(20000));
        assert_eq!(records[1].notes, "Mie Goreng(2)");
        assert!(!records[1].auto_stop);
    }

    #[test]
    fn test_seed_stock_keeps_existing_counter() {
        let store = SqliteStore::in_memory().unwrap();
        let item = ItemId::new("F1");

        assert!(store.seed_stock(&item, 50).unwrap());
        store.decrement_stock(&item, 3).unwrap();

        assert!(!store.seed_stock(&item, 50).unwrap());
        assert_eq!(store.get_stock(&item).unwrap(), Some(47));
    }

    #[test]
    fn test_decrement_stock() {
        let store = SqliteStore::in_memory().unwrap();
        let item = ItemId::new("F1");
        store.seed_stock(&item, 2).unwrap();

        assert_eq!(store.decrement_stock(&item, 2).unwrap(), 0);
        assert!(matches!(
            store.decrement_stock(&item, 1),
            Err(StoreError::OutOfStock(_))
        ));
        assert_eq!(store.get_stock(&item).unwrap(), Some(0));
    }

    #[test]
    fn test_decrement_unknown_item() {
        let store = SqliteStore::in_memory().unwrap();
        let item = ItemId::new("nope");

        assert!(store.get_stock(&item).unwrap().is_none());
        assert!(matches!(
            store.decrement_stock(&item, 1),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playmeter.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append_transaction(&record(1, 8000)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let records = store.recent_transactions(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_bill, Money::new(8000));
    }
}
