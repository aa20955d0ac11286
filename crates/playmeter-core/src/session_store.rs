//! Fixed-size collection of unit sessions

use chrono::{DateTime, Local};
use playmeter_api::UnitView;
use playmeter_config::default_unit_name;
use playmeter_util::UnitId;

use crate::{BillingError, BillingResult, UnitSession};

/// One session per unit, addressed by one-based unit id.
///
/// Resizing only appends fresh idle sessions or truncates at the tail, so
/// unit ids stay stable.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Vec<UnitSession>,
}

impl SessionStore {
    /// Create idle sessions, one per name
    pub fn new(names: &[String]) -> Self {
        let sessions = names
            .iter()
            .enumerate()
            .map(|(i, name)| UnitSession::new(UnitId::from_index(i), name.clone()))
            .collect();
        Self { sessions }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, unit: UnitId) -> BillingResult<&UnitSession> {
        unit.index()
            .and_then(|i| self.sessions.get(i))
            .ok_or(BillingError::UnitNotFound(unit))
    }

    pub fn get_mut(&mut self, unit: UnitId) -> BillingResult<&mut UnitSession> {
        unit.index()
            .and_then(|i| self.sessions.get_mut(i))
            .ok_or(BillingError::UnitNotFound(unit))
    }

    /// Borrow two distinct sessions mutably
    pub fn get_pair_mut(
        &mut self,
        a: UnitId,
        b: UnitId,
    ) -> BillingResult<(&mut UnitSession, &mut UnitSession)> {
        if a == b {
            return Err(BillingError::SameUnit(a));
        }
        let len = self.sessions.len();
        let slot = |unit: UnitId| {
            unit.index()
                .filter(|&i| i < len)
                .ok_or(BillingError::UnitNotFound(unit))
        };
        let ia = slot(a)?;
        let ib = slot(b)?;

        if ia < ib {
            let (left, right) = self.sessions.split_at_mut(ib);
            Ok((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.sessions.split_at_mut(ia);
            Ok((&mut right[0], &mut left[ib]))
        }
    }

    /// Sessions in unit order
    pub fn iter(&self) -> impl Iterator<Item = &UnitSession> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut UnitSession> {
        self.sessions.iter_mut()
    }

    /// Units that are not idle
    pub fn active(&self) -> impl Iterator<Item = &UnitSession> {
        self.sessions.iter().filter(|s| !s.is_idle())
    }

    /// Change the unit count, appending idle units or truncating the tail.
    ///
    /// Refuses to drop a unit that is not idle. `names` renames units by
    /// position; new units without a name get the default one.
    pub fn resize(&mut self, count: usize, names: &[String]) -> BillingResult<()> {
        if let Some(active) = self.sessions.iter().skip(count).find(|s| !s.is_idle()) {
            return Err(BillingError::ResizeWouldDropActive(active.unit_id()));
        }

        self.sessions.truncate(count);
        while self.sessions.len() < count {
            let unit = UnitId::from_index(self.sessions.len());
            self.sessions
                .push(UnitSession::new(unit, default_unit_name(unit.get())));
        }

        for (session, name) in self.sessions.iter_mut().zip(names) {
            session.rename(name.clone());
        }
        Ok(())
    }

    /// Views of every unit in order
    pub fn views(&self, now: DateTime<Local>) -> Vec<UnitView> {
        self.sessions.iter().map(|s| s.view(now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use playmeter_api::{PriceDefinition, UnitStatus};
    use playmeter_util::OperatorId;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Unit {}", i)).collect()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn start(store: &mut SessionStore, unit: u32) {
        store
            .get_mut(UnitId::new(unit))
            .unwrap()
            .start(
                PriceDefinition::hourly("OP1", "Open", 4000),
                OperatorId::new("staff"),
                now(),
            )
            .unwrap();
    }

    #[test]
    fn test_lookup_by_unit_id() {
        let store = SessionStore::new(&names(3));
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(UnitId::new(3)).unwrap().unit_name(), "Unit 3");
        assert_eq!(
            store.get(UnitId::new(0)).unwrap_err(),
            BillingError::UnitNotFound(UnitId::new(0))
        );
        assert!(store.get(UnitId::new(4)).is_err());
    }

    #[test]
    fn test_pair_borrow() {
        let mut store = SessionStore::new(&names(3));
        let (a, b) = store.get_pair_mut(UnitId::new(3), UnitId::new(1)).unwrap();
        assert_eq!(a.unit_id(), UnitId::new(3));
        assert_eq!(b.unit_id(), UnitId::new(1));

        assert!(matches!(
            store.get_pair_mut(UnitId::new(2), UnitId::new(2)),
            Err(BillingError::SameUnit(_))
        ));
        assert!(matches!(
            store.get_pair_mut(UnitId::new(1), UnitId::new(9)),
            Err(BillingError::UnitNotFound(_))
        ));
    }

    #[test]
    fn test_resize_grows_and_shrinks_at_tail() {
        let mut store = SessionStore::new(&names(2));
        start(&mut store, 1);

        store.resize(4, &[]).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(UnitId::new(4)).unwrap().unit_name(), "Unit 4");
        assert_eq!(
            store.get(UnitId::new(1)).unwrap().status(),
            UnitStatus::RunningOpen
        );

        store.resize(1, &["VIP".to_string()]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(UnitId::new(1)).unwrap().unit_name(), "VIP");
    }

    #[test]
    fn test_resize_refuses_to_drop_active_unit() {
        let mut store = SessionStore::new(&names(3));
        start(&mut store, 3);

        assert_eq!(
            store.resize(2, &[]),
            Err(BillingError::ResizeWouldDropActive(UnitId::new(3)))
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.active().count(), 1);
    }
}
