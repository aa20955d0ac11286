//! Pricing rules
//!
//! Pure functions turning a price definition and elapsed time into money.

use playmeter_api::{FnbOrder, PriceKind};
use playmeter_util::Money;
use std::time::Duration;

/// Length of one billed hour
pub const BILLING_HOUR: Duration = Duration::from_secs(3600);

/// Extension length used when a price carries no duration
pub const DEFAULT_EXTENSION: Duration = Duration::from_secs(60 * 60);

/// Hourly charge: every started hour is billed in full.
///
/// Zero elapsed time costs nothing. Returns None on overflow.
pub fn hourly_charge(rate: Money, elapsed: Duration) -> Option<Money> {
    let hours = elapsed.as_nanos().div_ceil(BILLING_HOUR.as_nanos());
    let hours = u64::try_from(hours).ok()?;
    rate.checked_mul(hours)
}

/// Amount charged when a session starts: packages are paid up front
pub fn start_charge(kind: &PriceKind) -> Money {
    match *kind {
        PriceKind::Package { price, .. } => price,
        PriceKind::Hourly { .. } => Money::ZERO,
    }
}

/// Package length, falling back to one hour for a zero duration
pub fn package_duration(duration_minutes: u32) -> Duration {
    if duration_minutes == 0 {
        DEFAULT_EXTENSION
    } else {
        Duration::from_secs(u64::from(duration_minutes) * 60)
    }
}

/// Time and money added by one extension with `kind`.
///
/// Packages add their duration and price. A package priced at zero charges
/// nothing; an hourly price adds one hour at its rate.
pub fn extension(kind: &PriceKind) -> (Duration, Money) {
    match *kind {
        PriceKind::Package {
            price,
            duration_minutes,
        } => (package_duration(duration_minutes), price),
        PriceKind::Hourly { rate } => (DEFAULT_EXTENSION, rate),
    }
}

/// Sum of all order totals, None on overflow
pub fn fnb_total(orders: &[FnbOrder]) -> Option<Money> {
    orders.iter().try_fold(Money::ZERO, |acc, order| {
        let line = order.unit_price.checked_mul(u64::from(order.quantity))?;
        acc.checked_add(line)
    })
}

/// Ledger notes for a set of orders: `name(qty)` joined by `;`
pub fn order_notes(orders: &[FnbOrder]) -> String {
    orders
        .iter()
        .map(|o| format!("{}({})", o.name, o.quantity))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmeter_util::ItemId;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_hourly_charge_rounds_up_started_hours() {
        let rate = Money::new(4000);
        assert_eq!(hourly_charge(rate, Duration::ZERO), Some(Money::ZERO));
        assert_eq!(hourly_charge(rate, secs(1)), Some(Money::new(4000)));
        assert_eq!(hourly_charge(rate, secs(3600)), Some(Money::new(4000)));
        assert_eq!(hourly_charge(rate, secs(3601)), Some(Money::new(8000)));
        assert_eq!(hourly_charge(rate, secs(7200)), Some(Money::new(8000)));
        assert_eq!(hourly_charge(rate, secs(7201)), Some(Money::new(12000)));
    }

    #[test]
    fn test_hourly_charge_sub_second() {
        let rate = Money::new(4000);
        assert_eq!(
            hourly_charge(rate, Duration::from_millis(1)),
            Some(Money::new(4000))
        );
        assert_eq!(
            hourly_charge(rate, secs(3600) + Duration::from_millis(1)),
            Some(Money::new(8000))
        );
    }

    #[test]
    fn test_hourly_charge_overflow() {
        assert_eq!(hourly_charge(Money::new(i64::MAX), secs(3601)), None);
    }

    #[test]
    fn test_start_charge() {
        let package = PriceKind::Package {
            price: Money::new(20000),
            duration_minutes: 60,
        };
        let hourly = PriceKind::Hourly {
            rate: Money::new(4000),
        };
        assert_eq!(start_charge(&package), Money::new(20000));
        assert_eq!(start_charge(&hourly), Money::ZERO);
    }

    #[test]
    fn test_extension() {
        let package = PriceKind::Package {
            price: Money::new(20000),
            duration_minutes: 90,
        };
        assert_eq!(extension(&package), (secs(90 * 60), Money::new(20000)));

        let hourly = PriceKind::Hourly {
            rate: Money::new(4000),
        };
        assert_eq!(extension(&hourly), (secs(3600), Money::new(4000)));

        let free = PriceKind::Package {
            price: Money::ZERO,
            duration_minutes: 0,
        };
        assert_eq!(extension(&free), (secs(3600), Money::ZERO));
    }

    #[test]
    fn test_fnb_total_and_notes() {
        let orders = vec![
            FnbOrder {
                item_id: ItemId::new("F1"),
                name: "Mie Goreng".into(),
                unit_price: Money::new(10000),
                quantity: 2,
                delivered: false,
            },
            FnbOrder {
                item_id: ItemId::new("F2"),
                name: "Es Teh".into(),
                unit_price: Money::new(3000),
                quantity: 1,
                delivered: true,
            },
        ];

        assert_eq!(fnb_total(&orders), Some(Money::new(23000)));
        assert_eq!(order_notes(&orders), "Mie Goreng(2);Es Teh(1)");
        assert_eq!(fnb_total(&[]), Some(Money::ZERO));
        assert_eq!(order_notes(&[]), "");
    }
}
