//! Line protocol spoken to the unit controller
//!
//! Status frame: `SYNC|` followed by one `id;name;STATUS;time;amount;flag|`
//! field group per unit. `time` is `HH:MM:SS` (hours unbounded) or `OFF`
//! for an idle unit, `amount` is the plain integer total bill including
//! F&B, and `flag` is `1` when an order is still undelivered.
//!
//! Relay command: `ON:<unit>` or `OFF:<unit>`.
//!
//! Encoders return the line without its terminator; sinks append `\n`.

use playmeter_api::{UnitStatus, UnitView};
use playmeter_util::UnitId;

pub use playmeter_util::format_hms;

/// Prefix of every status frame
pub const SYNC_PREFIX: &str = "SYNC|";

/// Time field sent for idle units
pub const IDLE_TIME: &str = "OFF";

/// Encode the status frame for the whole fleet
pub fn encode_sync_frame(units: &[UnitView]) -> String {
    let mut frame = String::from(SYNC_PREFIX);
    for unit in units {
        frame.push_str(&encode_unit(unit));
        frame.push('|');
    }
    frame
}

fn encode_unit(unit: &UnitView) -> String {
    let time = match (unit.status, unit.display_time) {
        (UnitStatus::Idle, _) | (_, None) => IDLE_TIME.to_string(),
        (_, Some(d)) => format_hms(d),
    };

    format!(
        "{};{};{};{};{};{}",
        unit.unit_id,
        sanitize_name(&unit.unit_name),
        unit.status.tag(),
        time,
        unit.total_bill.amount(),
        if unit.pending_delivery { 1 } else { 0 }
    )
}

/// Unit names are free text; the field and group separators and line
/// breaks would corrupt the frame.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ';' | '|' | '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}

/// Encode a relay command
pub fn encode_relay(unit: UnitId, on: bool) -> String {
    if on {
        format!("ON:{}", unit)
    } else {
        format!("OFF:{}", unit)
    }
}
