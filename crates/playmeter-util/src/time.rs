//! Time utilities for playmeterd
//!
//! Billing works on wall-clock timestamps (`DateTime<Local>`) because every
//! completed session is written to the ledger with its start and end times.
//! All core operations take `now` explicitly; only the daemon reads the clock.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `PLAYMETER_MOCK_TIME` environment variable can be set
//! to override the system time. The mocked clock advances at the real rate.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PLAYMETER_MOCK_TIME";

/// Offset between mock time and real time, computed once at first use.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => {
                        if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format a duration as `HH:MM:SS`.
///
/// Hours are zero-padded to two digits but not capped at 24.
pub fn format_hms(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Time elapsed from `earlier` to `later`, or zero if `later` is not after it.
pub fn saturating_elapsed(earlier: DateTime<Local>, later: DateTime<Local>) -> Duration {
    later
        .signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Fractional minutes from `earlier` to `later` (negative if reversed).
pub fn minutes_between(earlier: DateTime<Local>, later: DateTime<Local>) -> f64 {
    let millis = later.signed_duration_since(earlier).num_milliseconds();
    millis as f64 / 60_000.0
}

/// Add a std duration to a timestamp, returning None on overflow.
pub fn checked_add_duration(dt: DateTime<Local>, d: Duration) -> Option<DateTime<Local>> {
    let delta = chrono::Duration::from_std(d).ok()?;
    dt.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 12, 25, h, m, s).unwrap()
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::ZERO), "00:00:00");
        assert_eq!(format_hms(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_hms(Duration::from_secs(40 * 60)), "00:40:00");
        assert_eq!(format_hms(Duration::from_secs(3661)), "01:01:01");
    }

    #[test]
    fn test_format_hms_hours_not_capped() {
        assert_eq!(format_hms(Duration::from_secs(25 * 3600 + 5)), "25:00:05");
        assert_eq!(format_hms(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_format_datetime_full() {
        assert_eq!(format_datetime_full(&at(14, 30, 45)), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_saturating_elapsed() {
        assert_eq!(saturating_elapsed(at(10, 0, 0), at(11, 1, 0)), Duration::from_secs(3660));
        assert_eq!(saturating_elapsed(at(11, 0, 0), at(10, 0, 0)), Duration::ZERO);
    }

    #[test]
    fn test_minutes_between() {
        assert!((minutes_between(at(10, 0, 0), at(11, 1, 0)) - 61.0).abs() < f64::EPSILON);
        assert!((minutes_between(at(10, 0, 0), at(10, 0, 30)) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_checked_add_duration() {
        let later = checked_add_duration(at(10, 0, 0), Duration::from_secs(3600)).unwrap();
        assert_eq!(later, at(11, 0, 0));
        assert!(checked_add_duration(at(10, 0, 0), Duration::from_secs(u64::MAX)).is_none());
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "PLAYMETER_MOCK_TIME");
    }

    #[test]
    fn test_parse_mock_time_format() {
        let parsed = NaiveDateTime::parse_from_str("2025-12-25 14:30:00", "%Y-%m-%d %H:%M:%S");
        assert!(parsed.is_ok());
        assert!(NaiveDateTime::parse_from_str("14:30", "%Y-%m-%d %H:%M:%S").is_err());
    }
}
