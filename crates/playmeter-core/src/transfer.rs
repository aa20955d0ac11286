//! Moving a session from one unit to another

use playmeter_api::UnitStatus;
use playmeter_util::UnitId;

use crate::session::MovedSession;
use crate::{BillingError, BillingResult, SessionStore};

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub source: UnitId,
    pub destination: UnitId,
    pub source_status: UnitStatus,
    pub destination_status: UnitStatus,
}

/// Move the session on `source` to the idle unit `destination`.
///
/// The source is left idle, or faulted (`Trouble`) when `faulty` is set.
/// The destination carries on with the same price, start time, target,
/// amount, operator and orders. Targets are absolute, so a timed session
/// keeps its remaining time without adjustment.
pub fn transfer(
    sessions: &mut SessionStore,
    source: UnitId,
    destination: UnitId,
    faulty: bool,
) -> BillingResult<TransferOutcome> {
    let (src, dst) = sessions.get_pair_mut(source, destination)?;

    if src.is_idle() {
        return Err(BillingError::SourceIdle(source));
    }
    if !dst.is_idle() {
        return Err(BillingError::DestinationNotIdle(destination));
    }

    let moved = src.drain(faulty);
    let status = destination_status(&moved);
    dst.adopt(moved, status);

    Ok(TransferOutcome {
        source,
        destination,
        source_status: src.status(),
        destination_status: dst.status(),
    })
}

/// A faulted unit was already drained when it entered `Trouble`, so it
/// hands over nothing; a running source keeps its status.
fn destination_status(moved: &MovedSession) -> UnitStatus {
    match moved.status {
        UnitStatus::Trouble => UnitStatus::Idle,
        status => status,
    }
}
