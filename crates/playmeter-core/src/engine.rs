//! Billing engine
//!
//! Owns every unit session together with the price catalog and F&B menu.
//! Operations take `now` explicitly and return the events they caused; the
//! caller is expected to serialize access (one engine behind one lock).

use chrono::{DateTime, Local};
use playmeter_api::{
    FleetSnapshot, FnbOrder, MenuItemView, PriceDefinition, TransactionRecord, UnitView,
    API_VERSION,
};
use playmeter_config::{MenuItem, Settings, UnitLayout, MAX_UNIT_COUNT};
use playmeter_store::{AuditEvent, AuditEventType, Store, StoreError};
use playmeter_util::{ItemId, OperatorId, PriceId, UnitId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    reconcile, transfer, BillingError, BillingResult, CompletedSession, CoreEvent, SessionStore,
    UnitSession,
};

/// The billing engine
pub struct BillingEngine {
    sessions: SessionStore,
    settings: Settings,
    store: Arc<dyn Store>,
}

impl BillingEngine {
    /// Create an engine with every unit idle
    pub fn new(settings: Settings, store: Arc<dyn Store>) -> Self {
        let sessions = SessionStore::new(&settings.units.names);
        seed_menu_stock(store.as_ref(), &settings.menu);

        info!(
            units = sessions.len(),
            prices = settings.prices.len(),
            menu_items = settings.menu.len(),
            "Billing engine initialized"
        );

        Self {
            sessions,
            settings,
            store,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Units that are running or faulted
    pub fn active_units(&self) -> impl Iterator<Item = &UnitSession> {
        self.sessions.active()
    }

    pub fn prices(&self) -> &[PriceDefinition] {
        &self.settings.prices
    }

    /// Menu with live stock levels
    pub fn menu(&self) -> Vec<MenuItemView> {
        self.settings
            .menu
            .iter()
            .map(|item| MenuItemView {
                item_id: item.id.clone(),
                name: item.name.clone(),
                price: item.price,
                stock: match self.store.get_stock(&item.id) {
                    Ok(stock) => stock,
                    Err(e) => {
                        warn!(item_id = %item.id, error = %e, "Failed to read stock");
                        None
                    }
                },
            })
            .collect()
    }

    pub fn unit_view(&self, unit: UnitId, now: DateTime<Local>) -> BillingResult<UnitView> {
        Ok(self.sessions.get(unit)?.view(now))
    }

    /// Snapshot of the whole fleet
    pub fn snapshot(&self, now: DateTime<Local>) -> FleetSnapshot {
        FleetSnapshot {
            api_version: API_VERSION,
            taken_at: now,
            units: self.sessions.views(now),
        }
    }

    /// Most recent ledger records, newest first
    pub fn recent_transactions(&self, limit: usize) -> BillingResult<Vec<TransactionRecord>> {
        self.store
            .recent_transactions(limit)
            .map_err(|e| BillingError::Store(e.to_string()))
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to write audit event");
        }
    }

    fn price(&self, id: &PriceId) -> BillingResult<PriceDefinition> {
        self.settings
            .get_price(id)
            .cloned()
            .ok_or_else(|| BillingError::PriceNotFound(id.clone()))
    }

    /// Start a session on an idle unit
    pub fn start(
        &mut self,
        unit: UnitId,
        price_id: &PriceId,
        operator: OperatorId,
        now: DateTime<Local>,
    ) -> BillingResult<Vec<CoreEvent>> {
        self.sessions.get(unit)?;
        let price = self.price(price_id)?;
        let price_name = price.name.clone();

        let session = self.sessions.get_mut(unit)?;
        session.start(price, operator.clone(), now)?;
        let unit_name = session.unit_name().to_string();
        let target_end = session.target_end();

        self.audit(AuditEventType::SessionStarted {
            unit_id: unit,
            price_id: price_id.clone(),
            operator_id: operator.clone(),
            target_end,
        });

        info!(
            unit_id = %unit,
            price_id = %price_id,
            operator = %operator,
            target_end = ?target_end,
            "Session started"
        );

        Ok(vec![CoreEvent::SessionStarted {
            unit_id: unit,
            unit_name,
            price_name,
            target_end,
        }])
    }

    /// Add time and charge to a running session
    pub fn extend(
        &mut self,
        unit: UnitId,
        price_id: &PriceId,
        now: DateTime<Local>,
    ) -> BillingResult<Vec<CoreEvent>> {
        self.sessions.get(unit)?;
        let price = self.price(price_id)?;

        let session = self.sessions.get_mut(unit)?;
        session.extend(&price, now)?;
        let target_end = session.target_end();
        let current_amount = session.current_amount();

        self.audit(AuditEventType::SessionExtended {
            unit_id: unit,
            price_id: price_id.clone(),
            target_end,
            current_amount,
        });

        info!(
            unit_id = %unit,
            price_id = %price_id,
            target_end = ?target_end,
            current_amount = %current_amount,
            "Session extended"
        );

        Ok(vec![CoreEvent::SessionExtended {
            unit_id: unit,
            target_end,
            current_amount,
        }])
    }

    /// Stop a running session. Stopping an idle or faulted unit does nothing.
    pub fn stop(&mut self, unit: UnitId, now: DateTime<Local>) -> BillingResult<Vec<CoreEvent>> {
        let session = self.sessions.get_mut(unit)?;
        match session.stop(now, false)? {
            Some(done) => Ok(vec![self.complete(done)]),
            None => {
                debug!(unit_id = %unit, "Stop on inactive unit ignored");
                Ok(Vec::new())
            }
        }
    }

    /// Return a faulted unit to service
    pub fn reset_fault(&mut self, unit: UnitId) -> BillingResult<Vec<CoreEvent>> {
        self.sessions.get_mut(unit)?.reset_fault()?;

        self.audit(AuditEventType::FaultReset { unit_id: unit });
        info!(unit_id = %unit, "Fault reset");

        Ok(vec![CoreEvent::FaultReset { unit_id: unit }])
    }

    /// Order an F&B item for a running session, taking it out of stock
    pub fn add_order(
        &mut self,
        unit: UnitId,
        item_id: &ItemId,
        quantity: u32,
    ) -> BillingResult<Vec<CoreEvent>> {
        if quantity == 0 {
            return Err(BillingError::InvalidQuantity(quantity));
        }
        let item = self
            .settings
            .get_menu_item(item_id)
            .cloned()
            .ok_or_else(|| BillingError::ItemNotFound(item_id.clone()))?;
        self.sessions.get(unit)?.ensure_accepts_orders()?;

        let stock_left = self
            .store
            .decrement_stock(&item.id, quantity)
            .map_err(|e| match e {
                StoreError::OutOfStock(_) => BillingError::OutOfStock(item.id.clone()),
                other => BillingError::Store(other.to_string()),
            })?;

        self.sessions.get_mut(unit)?.add_order(FnbOrder {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
            delivered: false,
        })?;

        self.audit(AuditEventType::OrderAdded {
            unit_id: unit,
            item_id: item.id.clone(),
            quantity,
            unit_price: item.price,
        });

        info!(
            unit_id = %unit,
            item_id = %item.id,
            quantity,
            stock_left,
            "Order added"
        );

        Ok(vec![CoreEvent::OrderAdded {
            unit_id: unit,
            item_id: item.id,
            name: item.name,
            quantity,
            stock_left,
        }])
    }

    /// Mark every order on a unit delivered
    pub fn mark_delivered(&mut self, unit: UnitId) -> BillingResult<Vec<CoreEvent>> {
        let changed = self.sessions.get_mut(unit)?.mark_all_delivered();
        if changed == 0 {
            return Ok(Vec::new());
        }

        self.audit(AuditEventType::OrdersDelivered { unit_id: unit });
        info!(unit_id = %unit, orders = changed, "Orders delivered");

        Ok(vec![CoreEvent::OrdersDelivered { unit_id: unit }])
    }

    /// Move a session to an idle unit, optionally quarantining the source
    pub fn transfer(
        &mut self,
        source: UnitId,
        destination: UnitId,
        faulty: bool,
        now: DateTime<Local>,
    ) -> BillingResult<Vec<CoreEvent>> {
        let outcome = transfer(&mut self.sessions, source, destination, faulty)?;
        let remaining = self.sessions.get(destination)?.display_time(now);

        self.audit(AuditEventType::SessionTransferred {
            source,
            destination,
            faulty,
        });

        info!(
            source = %source,
            destination = %destination,
            faulty,
            source_status = ?outcome.source_status,
            destination_status = ?outcome.destination_status,
            remaining = ?remaining,
            "Session transferred"
        );

        Ok(vec![CoreEvent::SessionTransferred {
            source,
            destination,
            source_status: outcome.source_status,
            destination_status: outcome.destination_status,
        }])
    }

    /// Periodic reconciliation: accrue open sessions and auto-stop expired
    /// timers. Never fails; a unit that cannot be reconciled is skipped.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let outcome = reconcile(&mut self.sessions, now);

        for (unit, error) in &outcome.failures {
            warn!(unit_id = %unit, error = %error, "Unit skipped this tick");
        }

        outcome
            .expired
            .into_iter()
            .map(|done| self.complete(done))
            .collect()
    }

    /// Hand a completed session to the ledger
    fn complete(&self, done: CompletedSession) -> CoreEvent {
        let CompletedSession {
            record,
            needs_collection,
        } = done;

        if let Err(e) = self.store.append_transaction(&record) {
            warn!(
                unit_id = %record.unit_id,
                total_bill = %record.total_bill,
                error = %e,
                "Failed to write ledger record"
            );
        }

        self.audit(AuditEventType::SessionStopped {
            unit_id: record.unit_id,
            total_bill: record.total_bill,
            duration_minutes: record.duration_minutes,
            auto: record.auto_stop,
        });

        info!(
            unit_id = %record.unit_id,
            total_bill = %record.total_bill,
            duration_minutes = record.duration_minutes,
            auto = record.auto_stop,
            needs_collection,
            "Session stopped"
        );

        CoreEvent::SessionStopped {
            auto: record.auto_stop,
            record,
            needs_collection,
        }
    }

    /// Rename a unit; allowed in any status
    pub fn rename_unit(&mut self, unit: UnitId, name: String) -> BillingResult<Vec<CoreEvent>> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(BillingError::InvalidName(name));
        }

        self.sessions.get_mut(unit)?.rename(name.clone());
        self.sync_layout();

        self.audit(AuditEventType::UnitRenamed {
            unit_id: unit,
            name: name.clone(),
        });
        info!(unit_id = %unit, name = %name, "Unit renamed");

        Ok(vec![CoreEvent::UnitRenamed {
            unit_id: unit,
            name,
        }])
    }

    /// Change the unit count. Units past the new count must be idle.
    pub fn resize(&mut self, count: u32, names: &[String]) -> BillingResult<Vec<CoreEvent>> {
        if count == 0 || count > MAX_UNIT_COUNT {
            return Err(BillingError::InvalidUnitCount(count));
        }
        if let Some(bad) = names.iter().find(|n| n.trim().is_empty()) {
            return Err(BillingError::InvalidName(bad.clone()));
        }

        let from = self.sessions.len() as u32;
        self.sessions.resize(count as usize, names)?;
        self.sync_layout();

        self.audit(AuditEventType::UnitsResized { from, to: count });
        info!(from, to = count, "Units resized");

        Ok(vec![CoreEvent::UnitsResized { from, to: count }])
    }

    /// Apply a reloaded configuration: prices, menu, unit count and names.
    ///
    /// Running sessions keep their price snapshot. Nothing is applied if the
    /// new layout would drop an active unit.
    pub fn reload_catalog(&mut self, settings: Settings) -> BillingResult<Vec<CoreEvent>> {
        let from = self.sessions.len() as u32;
        let to = settings.units.count;
        self.sessions
            .resize(to as usize, &settings.units.names)?;

        seed_menu_stock(self.store.as_ref(), &settings.menu);

        let price_count = settings.prices.len();
        let menu_count = settings.menu.len();
        self.settings = settings;
        self.sync_layout();

        info!(price_count, menu_count, units = to, "Catalog reloaded");

        let mut events = Vec::new();
        if from != to {
            self.audit(AuditEventType::UnitsResized { from, to });
            events.push(CoreEvent::UnitsResized { from, to });
        }
        events.push(CoreEvent::CatalogReloaded {
            price_count,
            menu_count,
        });
        Ok(events)
    }

    fn sync_layout(&mut self) {
        let names: Vec<String> = self
            .sessions
            .iter()
            .map(|s| s.unit_name().to_string())
            .collect();
        self.settings.units = UnitLayout::new(names.len() as u32, &names);
    }
}

/// Create stock counters for menu items that have none yet
fn seed_menu_stock(store: &dyn Store, menu: &[MenuItem]) {
    for item in menu {
        match store.seed_stock(&item.id, item.initial_stock) {
            Ok(true) => debug!(item_id = %item.id, stock = item.initial_stock, "Stock seeded"),
            Ok(false) => {}
            Err(e) => warn!(item_id = %item.id, error = %e, "Failed to seed stock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use playmeter_api::UnitStatus;
    use playmeter_config::ServiceConfig;
    use playmeter_store::SqliteStore;
    use playmeter_util::Money;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn mins(m: i64) -> chrono::Duration {
        chrono::Duration::minutes(m)
    }

    fn make_test_settings(units: u32) -> Settings {
        Settings {
            service: ServiceConfig::default(),
            units: UnitLayout::new(units, &[]),
            prices: vec![
                PriceDefinition::package("P1", "Reguler PS3", 20000, 60),
                PriceDefinition::hourly("OP1", "Open PS3", 4000),
            ],
            menu: vec![MenuItem {
                id: ItemId::new("F1"),
                name: "Mie Goreng".into(),
                price: Money::new(10000),
                initial_stock: 3,
            }],
        }
    }

    fn make_engine(units: u32) -> (BillingEngine, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = BillingEngine::new(make_test_settings(units), store.clone());
        (engine, store)
    }

    fn unit(n: u32) -> UnitId {
        UnitId::new(n)
    }

    fn staff() -> OperatorId {
        OperatorId::new("staff")
    }

    fn assert_invariants(engine: &BillingEngine) {
        for s in engine.sessions().iter() {
            match s.status() {
                UnitStatus::Idle => {
                    assert_eq!(s.current_amount(), Money::ZERO);
                    assert!(s.orders().is_empty());
                    assert!(s.price().is_none());
                }
                UnitStatus::RunningTimer => assert!(s.target_end().is_some()),
                UnitStatus::RunningOpen => assert!(s.target_end().is_none()),
                UnitStatus::Trouble => {
                    assert!(s.paused_remaining().is_some());
                    assert!(s.orders().is_empty());
                }
            }
        }
    }

    #[test]
    fn test_engine_starts_idle_and_seeds_stock() {
        let (engine, store) = make_engine(10);
        assert_eq!(engine.sessions().len(), 10);
        assert_eq!(engine.active_units().count(), 0);
        assert_eq!(store.get_stock(&ItemId::new("F1")).unwrap(), Some(3));
        assert_eq!(engine.menu()[0].stock, Some(3));
    }

    #[test]
    fn test_start_emits_event_and_relay_on() {
        let (mut engine, store) = make_engine(2);
        let events = engine
            .start(unit(1), &PriceId::new("P1"), staff(), t0())
            .unwrap();

        assert_eq!(events.len(), 1);
        match &events[0] {
            CoreEvent::SessionStarted {
                unit_id,
                price_name,
                target_end,
                ..
            } => {
                assert_eq!(*unit_id, unit(1));
                assert_eq!(price_name, "Reguler PS3");
                assert_eq!(*target_end, Some(t0() + mins(60)));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events[0].relay_commands()[0].on);

        let audits = store.get_recent_audits(10).unwrap();
        assert!(matches!(audits[0].event, AuditEventType::SessionStarted { .. }));
    }

    #[test]
    fn test_start_unknown_price_or_unit() {
        let (mut engine, _) = make_engine(2);
        assert_eq!(
            engine
                .start(unit(1), &PriceId::new("nope"), staff(), t0())
                .unwrap_err(),
            BillingError::PriceNotFound(PriceId::new("nope"))
        );
        assert_eq!(
            engine
                .start(unit(9), &PriceId::new("P1"), staff(), t0())
                .unwrap_err(),
            BillingError::UnitNotFound(unit(9))
        );
    }

    #[test]
    fn test_hourly_scenario() {
        let (mut engine, store) = make_engine(2);
        engine
            .start(unit(1), &PriceId::new("OP1"), staff(), t0())
            .unwrap();

        let events = engine.tick(t0() + mins(61));
        assert!(events.is_empty());
        assert_eq!(
            engine.unit_view(unit(1), t0() + mins(61)).unwrap().current_amount,
            Money::new(8000)
        );

        engine.add_order(unit(1), &ItemId::new("F1"), 2).unwrap();
        assert_eq!(store.get_stock(&ItemId::new("F1")).unwrap(), Some(1));

        let events = engine.stop(unit(1), t0() + mins(61)).unwrap();
        match &events[0] {
            CoreEvent::SessionStopped {
                record,
                auto,
                needs_collection,
            } => {
                assert_eq!(record.total_bill, Money::new(28000));
                assert!((record.duration_minutes - 61.0).abs() < 0.01);
                assert!(!auto);
                assert!(needs_collection);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let ledger = store.recent_transactions(10).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].total_bill, Money::new(28000));
        assert_eq!(ledger[0].notes, "Mie Goreng(2)");
        assert_invariants(&engine);
    }

    #[test]
    fn test_package_scenario_auto_stop() {
        let (mut engine, store) = make_engine(2);
        engine
            .start(unit(2), &PriceId::new("P1"), staff(), t0())
            .unwrap();

        let events = engine.tick(t0() + mins(61));
        assert_eq!(events.len(), 1);
        match &events[0] {
            CoreEvent::SessionStopped { record, auto, .. } => {
                assert_eq!(record.total_bill, Money::new(20000));
                assert!(*auto);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events[0].relay_commands(), vec![crate::RelayCommand::off(unit(2))]);

        assert!(engine.sessions().get(unit(2)).unwrap().is_idle());
        assert_eq!(store.recent_transactions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_stop_twice_writes_one_record() {
        let (mut engine, store) = make_engine(2);
        engine
            .start(unit(1), &PriceId::new("P1"), staff(), t0())
            .unwrap();

        assert_eq!(engine.stop(unit(1), t0()).unwrap().len(), 1);
        assert!(engine.stop(unit(1), t0()).unwrap().is_empty());
        assert!(engine.stop(unit(1), t0()).unwrap().is_empty());
        assert_eq!(store.recent_transactions(10).unwrap().len(), 1);
    }

    #[test]
    fn test_extend_timer_session() {
        let (mut engine, _) = make_engine(1);
        engine
            .start(unit(1), &PriceId::new("P1"), staff(), t0())
            .unwrap();
        engine
            .extend(unit(1), &PriceId::new("P1"), t0() + mins(10))
            .unwrap();

        let view = engine.unit_view(unit(1), t0() + mins(10)).unwrap();
        assert_eq!(view.status, UnitStatus::RunningTimer);
        assert_eq!(view.target_end, Some(t0() + mins(120)));
        assert_eq!(view.current_amount, Money::new(40000));
    }

    #[test]
    fn test_order_rules() {
        let (mut engine, store) = make_engine(2);

        assert_eq!(
            engine.add_order(unit(1), &ItemId::new("F1"), 1).unwrap_err(),
            BillingError::UnitNotActive(unit(1))
        );
        // Refused orders never touch stock
        assert_eq!(store.get_stock(&ItemId::new("F1")).unwrap(), Some(3));

        engine
            .start(unit(1), &PriceId::new("OP1"), staff(), t0())
            .unwrap();
        assert_eq!(
            engine.add_order(unit(1), &ItemId::new("F1"), 0).unwrap_err(),
            BillingError::InvalidQuantity(0)
        );
        assert_eq!(
            engine.add_order(unit(1), &ItemId::new("F9"), 1).unwrap_err(),
            BillingError::ItemNotFound(ItemId::new("F9"))
        );

        engine.add_order(unit(1), &ItemId::new("F1"), 3).unwrap();
        assert_eq!(
            engine.add_order(unit(1), &ItemId::new("F1"), 1).unwrap_err(),
            BillingError::OutOfStock(ItemId::new("F1"))
        );
        assert_eq!(engine.sessions().get(unit(1)).unwrap().orders().len(), 1);

        assert_eq!(engine.mark_delivered(unit(1)).unwrap().len(), 1);
        assert!(engine.mark_delivered(unit(1)).unwrap().is_empty());
    }

    #[test]
    fn test_transfer_scenario() {
        let (mut engine, _) = make_engine(3);
        engine
            .start(unit(1), &PriceId::new("P1"), staff(), t0())
            .unwrap();

        let now = t0() + mins(20);
        let events = engine.transfer(unit(1), unit(3), false, now).unwrap();
        assert_eq!(
            events[0].relay_commands(),
            vec![crate::RelayCommand::off(unit(1)), crate::RelayCommand::on(unit(3))]
        );

        let dst = engine.unit_view(unit(3), now).unwrap();
        assert_eq!(dst.status, UnitStatus::RunningTimer);
        assert_eq!(dst.target_end, Some(now + mins(40)));
        assert!(engine.sessions().get(unit(1)).unwrap().is_idle());
        assert_invariants(&engine);
    }

    #[test]
    fn test_faulty_transfer_and_reset() {
        let (mut engine, _) = make_engine(2);
        engine
            .start(unit(1), &PriceId::new("OP1"), staff(), t0())
            .unwrap();
        engine.transfer(unit(1), unit(2), true, t0()).unwrap();

        assert_eq!(
            engine.sessions().get(unit(1)).unwrap().status(),
            UnitStatus::Trouble
        );
        assert!(engine.stop(unit(1), t0()).unwrap().is_empty());
        assert!(matches!(
            engine.start(unit(1), &PriceId::new("P1"), staff(), t0()),
            Err(BillingError::InvalidTransition { .. })
        ));
        assert_invariants(&engine);

        let events = engine.reset_fault(unit(1)).unwrap();
        assert_eq!(events[0].relay_commands(), vec![crate::RelayCommand::off(unit(1))]);
        assert!(engine.sessions().get(unit(1)).unwrap().is_idle());
        assert!(engine.reset_fault(unit(1)).is_err());
    }

    #[test]
    fn test_rename_and_resize() {
        let (mut engine, _) = make_engine(3);
        engine
            .start(unit(3), &PriceId::new("OP1"), staff(), t0())
            .unwrap();

        engine.rename_unit(unit(3), "VIP".into()).unwrap();
        assert_eq!(engine.settings().units.names[2], "VIP");
        assert!(engine.rename_unit(unit(3), "  ".into()).is_err());

        assert_eq!(
            engine.resize(2, &[]).unwrap_err(),
            BillingError::ResizeWouldDropActive(unit(3))
        );
        assert_eq!(engine.resize(0, &[]).unwrap_err(), BillingError::InvalidUnitCount(0));

        engine.resize(5, &[]).unwrap();
        assert_eq!(engine.sessions().len(), 5);
        assert_eq!(engine.settings().units.count, 5);
        assert_eq!(engine.sessions().get(unit(3)).unwrap().unit_name(), "VIP");
    }

    #[test]
    fn test_reload_catalog_keeps_running_price() {
        let (mut engine, store) = make_engine(2);
        engine
            .start(unit(1), &PriceId::new("OP1"), staff(), t0())
            .unwrap();

        let mut settings = make_test_settings(4);
        settings.prices = vec![PriceDefinition::hourly("OP1", "Open PS3", 9000)];
        settings.menu.push(MenuItem {
            id: ItemId::new("F2"),
            name: "Es Teh".into(),
            price: Money::new(3000),
            initial_stock: 20,
        });

        let events = engine.reload_catalog(settings).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, CoreEvent::UnitsResized { from: 2, to: 4 })));
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::CatalogReloaded {
                price_count: 1,
                menu_count: 2
            }
        )));
        assert_eq!(store.get_stock(&ItemId::new("F2")).unwrap(), Some(20));

        engine.tick(t0() + mins(30));
        assert_eq!(
            engine.unit_view(unit(1), t0() + mins(30)).unwrap().current_amount,
            Money::new(4000)
        );
    }

    #[test]
    fn test_reload_refuses_to_drop_active_unit() {
        let (mut engine, _) = make_engine(3);
        engine
            .start(unit(3), &PriceId::new("OP1"), staff(), t0())
            .unwrap();

        let result = engine.reload_catalog(make_test_settings(1));
        assert_eq!(result.unwrap_err(), BillingError::ResizeWouldDropActive(unit(3)));
        assert_eq!(engine.sessions().len(), 3);
    }

    #[test]
    fn test_snapshot_lists_every_unit() {
        let (mut engine, _) = make_engine(3);
        engine
            .start(unit(2), &PriceId::new("P1"), staff(), t0())
            .unwrap();

        let snapshot = engine.snapshot(t0());
        assert_eq!(snapshot.api_version, API_VERSION);
        assert_eq!(snapshot.units.len(), 3);
        assert_eq!(snapshot.units[1].status, UnitStatus::RunningTimer);
        assert_eq!(snapshot.units[0].status, UnitStatus::Idle);
    }
}
