//! Unit session state machine
//!
//! One `UnitSession` exists per physical unit for the lifetime of the
//! process. Sessions are never destroyed, only reset to `Idle`. All state
//! changes go through the methods below, which keep these invariants:
//!
//! - `Idle`: no price, start, target, or orders, and a zero amount
//! - `RunningTimer`: a target end time is set
//! - `RunningOpen`: no target end time
//! - `Trouble`: a paused remainder is set and there are no orders

use chrono::{DateTime, Local};
use playmeter_api::{FnbOrder, PriceDefinition, PriceKind, TransactionRecord, UnitStatus, UnitView};
use playmeter_util::{
    checked_add_duration, minutes_between, saturating_elapsed, Money, OperatorId, UnitId,
};
use std::time::Duration;

use crate::pricing;
use crate::{BillingError, BillingResult};

/// Per-unit billing session
#[derive(Debug, Clone)]
pub struct UnitSession {
    unit_id: UnitId,
    unit_name: String,
    status: UnitStatus,
    price: Option<PriceDefinition>,
    operator_id: Option<OperatorId>,
    started_at: Option<DateTime<Local>>,
    target_end: Option<DateTime<Local>>,
    paused_remaining: Option<Duration>,
    current_amount: Money,
    orders: Vec<FnbOrder>,
}

/// Result of stopping a running session
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub record: TransactionRecord,
    /// Manual stop of a postpaid session: payment still has to be collected
    pub needs_collection: bool,
}

/// Session state lifted out of a unit during a transfer
#[derive(Debug, Clone)]
pub(crate) struct MovedSession {
    pub(crate) status: UnitStatus,
    pub(crate) price: Option<PriceDefinition>,
    pub(crate) operator_id: Option<OperatorId>,
    pub(crate) started_at: Option<DateTime<Local>>,
    pub(crate) target_end: Option<DateTime<Local>>,
    pub(crate) paused_remaining: Option<Duration>,
    pub(crate) current_amount: Money,
    pub(crate) orders: Vec<FnbOrder>,
}

impl UnitSession {
    /// Create an idle session for a unit
    pub fn new(unit_id: UnitId, unit_name: impl Into<String>) -> Self {
        Self {
            unit_id,
            unit_name: unit_name.into(),
            status: UnitStatus::Idle,
            price: None,
            operator_id: None,
            started_at: None,
            target_end: None,
            paused_remaining: None,
            current_amount: Money::ZERO,
            orders: Vec::new(),
        }
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn price(&self) -> Option<&PriceDefinition> {
        self.price.as_ref()
    }

    pub fn operator_id(&self) -> Option<&OperatorId> {
        self.operator_id.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn target_end(&self) -> Option<DateTime<Local>> {
        self.target_end
    }

    pub fn paused_remaining(&self) -> Option<Duration> {
        self.paused_remaining
    }

    /// Accrued charge, excluding F&B
    pub fn current_amount(&self) -> Money {
        self.current_amount
    }

    pub fn orders(&self) -> &[FnbOrder] {
        &self.orders
    }

    pub fn is_idle(&self) -> bool {
        self.status == UnitStatus::Idle
    }

    /// Sum of all order totals
    pub fn fnb_total(&self) -> Money {
        self.orders.iter().map(FnbOrder::total).sum()
    }

    /// Accrued charge plus F&B
    pub fn total_bill(&self) -> Money {
        self.current_amount + self.fnb_total()
    }

    pub fn has_undelivered_orders(&self) -> bool {
        self.orders.iter().any(|o| !o.delivered)
    }

    /// Name edits are allowed in any status
    pub fn rename(&mut self, name: impl Into<String>) {
        self.unit_name = name.into();
    }

    fn invalid(&self, operation: &'static str) -> BillingError {
        BillingError::InvalidTransition {
            unit: self.unit_id,
            status: self.status,
            operation,
        }
    }

    /// Start a session on an idle unit.
    ///
    /// Packages run against a timer and are charged up front; hourly prices
    /// run open and accrue on each tick.
    pub fn start(
        &mut self,
        price: PriceDefinition,
        operator: OperatorId,
        now: DateTime<Local>,
    ) -> BillingResult<()> {
        if self.status != UnitStatus::Idle {
            return Err(self.invalid("start"));
        }

        let (status, target_end) = match price.kind {
            PriceKind::Package {
                duration_minutes, ..
            } => {
                let target = checked_add_duration(now, pricing::package_duration(duration_minutes))
                    .ok_or(BillingError::TimeOverflow(self.unit_id))?;
                (UnitStatus::RunningTimer, Some(target))
            }
            PriceKind::Hourly { .. } => (UnitStatus::RunningOpen, None),
        };

        self.status = status;
        self.current_amount = pricing::start_charge(&price.kind);
        self.price = Some(price);
        self.operator_id = Some(operator);
        self.started_at = Some(now);
        self.target_end = target_end;
        self.paused_remaining = None;
        self.orders.clear();
        Ok(())
    }

    /// Add time and charge to a running session.
    ///
    /// An open session is settled up to `now` and then continues on a timer
    /// ending one extension from now. Moving it to `RunningTimer` is
    /// intended: an open session has no target end, and an extended one does.
    pub fn extend(&mut self, price: &PriceDefinition, now: DateTime<Local>) -> BillingResult<()> {
        if !self.status.is_running() {
            return Err(self.invalid("extend"));
        }

        if self.status == UnitStatus::RunningOpen {
            self.accrue(now)?;
        }

        let (duration, charge) = pricing::extension(&price.kind);
        let base = self.target_end.unwrap_or(now);
        let target = checked_add_duration(base, duration)
            .ok_or(BillingError::TimeOverflow(self.unit_id))?;
        let amount = self
            .current_amount
            .checked_add(charge)
            .ok_or(BillingError::AmountOverflow(self.unit_id))?;

        self.target_end = Some(target);
        self.current_amount = amount;
        self.status = UnitStatus::RunningTimer;
        Ok(())
    }

    /// Recompute the open-session charge from the elapsed time.
    ///
    /// Only hourly sessions running open accrue; package charges are final
    /// at start. Returns whether the amount changed.
    pub fn accrue(&mut self, now: DateTime<Local>) -> BillingResult<bool> {
        if self.status != UnitStatus::RunningOpen {
            return Ok(false);
        }
        let (Some(PriceKind::Hourly { rate }), Some(started)) =
            (self.price.as_ref().map(|p| p.kind), self.started_at)
        else {
            return Ok(false);
        };
        if now < started {
            return Err(BillingError::ClockWentBackwards(self.unit_id));
        }

        let amount = pricing::hourly_charge(rate, saturating_elapsed(started, now))
            .ok_or(BillingError::AmountOverflow(self.unit_id))?;
        let changed = amount != self.current_amount;
        self.current_amount = amount;
        Ok(changed)
    }

    /// True once a timed session has reached its target end
    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        self.status == UnitStatus::RunningTimer && self.target_end.is_some_and(|t| t <= now)
    }

    /// Stop a running session and produce its ledger record.
    ///
    /// Returns None (and changes nothing) for idle or faulted units. A bill
    /// that no longer fits in `Money` is refused and the session keeps
    /// running.
    pub fn stop(
        &mut self,
        now: DateTime<Local>,
        auto: bool,
    ) -> BillingResult<Option<CompletedSession>> {
        if !self.status.is_running() {
            return Ok(None);
        }

        // Settle the started hour; a clock error keeps the last accrued amount.
        let _ = self.accrue(now);

        let total_bill = pricing::fnb_total(&self.orders)
            .and_then(|fnb| self.current_amount.checked_add(fnb))
            .ok_or(BillingError::AmountOverflow(self.unit_id))?;

        let price = self.price.take();
        let record = TransactionRecord {
            timestamp: now,
            unit_id: self.unit_id,
            unit_name: self.unit_name.clone(),
            operator_id: self
                .operator_id
                .take()
                .unwrap_or_else(|| OperatorId::new("")),
            package_name: price.as_ref().map(|p| p.name.clone()).unwrap_or_default(),
            total_bill,
            duration_minutes: self
                .started_at
                .map(|s| minutes_between(s, now).max(0.0))
                .unwrap_or(0.0),
            notes: pricing::order_notes(&self.orders),
            auto_stop: auto,
        };
        let needs_collection = !auto && price.as_ref().is_some_and(PriceDefinition::is_postpaid);

        self.reset();
        Ok(Some(CompletedSession {
            record,
            needs_collection,
        }))
    }

    /// Return a faulted unit to service
    pub fn reset_fault(&mut self) -> BillingResult<()> {
        if self.status != UnitStatus::Trouble {
            return Err(self.invalid("reset"));
        }
        self.reset();
        Ok(())
    }

    /// Check that orders can be attached to this unit
    pub fn ensure_accepts_orders(&self) -> BillingResult<()> {
        match self.status {
            UnitStatus::Idle | UnitStatus::Trouble => Err(BillingError::UnitNotActive(self.unit_id)),
            UnitStatus::RunningTimer | UnitStatus::RunningOpen => Ok(()),
        }
    }

    /// Attach an undelivered order to the running session
    pub fn add_order(&mut self, order: FnbOrder) -> BillingResult<()> {
        self.ensure_accepts_orders()?;
        if order.quantity == 0 {
            return Err(BillingError::InvalidQuantity(0));
        }
        pricing::fnb_total(std::slice::from_ref(&order))
            .and_then(|added| added.checked_add(pricing::fnb_total(&self.orders)?))
            .and_then(|fnb| fnb.checked_add(self.current_amount))
            .ok_or(BillingError::AmountOverflow(self.unit_id))?;

        self.orders.push(FnbOrder {
            delivered: false,
            ..order
        });
        Ok(())
    }

    /// Mark every order delivered, returning how many changed
    pub fn mark_all_delivered(&mut self) -> usize {
        let mut changed = 0;
        for order in self.orders.iter_mut().filter(|o| !o.delivered) {
            order.delivered = true;
            changed += 1;
        }
        changed
    }

    /// Time shown for this unit: frozen remainder when faulted, countdown
    /// when timed, elapsed time when open, None when idle
    pub fn display_time(&self, now: DateTime<Local>) -> Option<Duration> {
        match self.status {
            UnitStatus::Idle => None,
            UnitStatus::Trouble => self.paused_remaining,
            UnitStatus::RunningTimer | UnitStatus::RunningOpen => match self.target_end {
                Some(target) => Some(saturating_elapsed(now, target)),
                None => self.started_at.map(|s| saturating_elapsed(s, now)),
            },
        }
    }

    /// Read-only view for clients and the status frame
    pub fn view(&self, now: DateTime<Local>) -> UnitView {
        UnitView {
            unit_id: self.unit_id,
            unit_name: self.unit_name.clone(),
            status: self.status,
            price: self.price.clone(),
            operator_id: self.operator_id.clone(),
            started_at: self.started_at,
            target_end: self.target_end,
            paused_remaining: self.paused_remaining,
            display_time: self.display_time(now),
            current_amount: self.current_amount,
            total_bill: self.total_bill(),
            orders: self.orders.clone(),
            pending_delivery: self.has_undelivered_orders(),
        }
    }

    fn reset(&mut self) {
        self.status = UnitStatus::Idle;
        self.price = None;
        self.operator_id = None;
        self.started_at = None;
        self.target_end = None;
        self.paused_remaining = None;
        self.current_amount = Money::ZERO;
        self.orders.clear();
    }

    /// Lift the session out of this unit, leaving it idle, or faulted with
    /// no remembered countdown
    pub(crate) fn drain(&mut self, faulty: bool) -> MovedSession {
        let moved = MovedSession {
            status: self.status,
            price: self.price.take(),
            operator_id: self.operator_id.take(),
            started_at: self.started_at.take(),
            target_end: self.target_end.take(),
            paused_remaining: self.paused_remaining.take(),
            current_amount: self.current_amount,
            orders: std::mem::take(&mut self.orders),
        };

        self.reset();
        if faulty {
            self.status = UnitStatus::Trouble;
            self.paused_remaining = Some(Duration::ZERO);
        }
        moved
    }

    /// Install a moved session on this (idle) unit with the given status
    pub(crate) fn adopt(&mut self, moved: MovedSession, status: UnitStatus) {
        if status == UnitStatus::Idle {
            self.reset();
            return;
        }

        self.status = status;
        self.price = moved.price;
        self.operator_id = moved.operator_id;
        self.started_at = moved.started_at;
        self.target_end = moved.target_end;
        self.paused_remaining = None;
        self.current_amount = moved.current_amount;
        self.orders = moved.orders;
    }
}
