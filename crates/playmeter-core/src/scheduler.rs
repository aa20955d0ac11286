//! Scheduler tick: periodic reconciliation of running sessions

use chrono::{DateTime, Local};
use playmeter_util::UnitId;

use crate::{BillingError, CompletedSession, SessionStore};

/// What one reconciliation pass did
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Sessions auto-stopped because their timer ran out, in unit order
    pub expired: Vec<CompletedSession>,
    /// Units whose accrual failed this pass; they were skipped
    pub failures: Vec<(UnitId, BillingError)>,
    /// Number of units whose accrued amount changed
    pub accrued: usize,
}

/// Recompute accrual for every running session and stop expired timers.
///
/// Sessions are visited in unit order. A failing session is recorded and
/// skipped; it never stops the pass.
pub fn reconcile(sessions: &mut SessionStore, now: DateTime<Local>) -> TickOutcome {
    let mut outcome = TickOutcome::default();

    for session in sessions.iter_mut() {
        if !session.status().is_running() {
            continue;
        }

        match session.accrue(now) {
            Ok(true) => outcome.accrued += 1,
            Ok(false) => {}
            Err(e) => {
                outcome.failures.push((session.unit_id(), e));
                continue;
            }
        }

        if session.is_expired(now) {
            match session.stop(now, true) {
                Ok(Some(done)) => outcome.expired.push(done),
                Ok(None) => {}
                Err(e) => outcome.failures.push((session.unit_id(), e)),
            }
        }
    }

    outcome
}
