//! Reminder cadence for expiring documents.
//!
//! Reminders get denser as the expiry date approaches and turn into a daily
//! nag for the first week after it has passed:
//!
//! | days remaining | fires on            |
//! |----------------|---------------------|
//! | 16..=30        | multiples of 5      |
//! | 8..=15         | 15, 13, 11, 9       |
//! | 0..=7          | 7, 5, 3, 1, 0       |
//! | -7..=-1        | every day           |
//!
//! Nothing fires outside `-7..=30`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Earliest day (relative to expiry) that still gets a reminder.
pub const NAG_FLOOR_DAYS: i64 = -7;
/// Latest day (relative to expiry) that gets a reminder.
pub const NOTICE_WINDOW_DAYS: i64 = 30;

const NEAR_TERM_DAYS: [i64; 5] = [7, 5, 3, 1, 0];

/// Whole calendar days from `today` until `expiry`. Negative once expired.
pub fn days_remaining(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

/// Whether a document `days` away from expiry is due a reminder today.
pub fn should_notify(days: i64) -> bool {
    match days {
        16..=30 => days % 5 == 0,
        8..=15 => (15 - days) % 2 == 0,
        0..=7 => NEAR_TERM_DAYS.contains(&days),
        -7..=-1 => true,
        _ => false,
    }
}

/// Human-readable urgency, e.g. `"expires in 5 days"` or `"expired 1 day ago"`.
pub fn urgency_phrase(days: i64) -> String {
    match days {
        0 => "expires today".to_string(),
        d if d > 0 => format!("expires in {} {}", d, day_word(d)),
        d => format!("expired {} {} ago", -d, day_word(-d)),
    }
}

fn day_word(n: i64) -> &'static str {
    if n == 1 {
        "day"
    } else {
        "days"
    }
}

/// Parse a stored expiry value to its calendar date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (normalized to UTC) and the
/// zone-less datetime forms SQLite's `date()` understands (`HH:MM`,
/// `HH:MM:SS`, fractional seconds, space or `T` separator). Time of day is
/// discarded.
pub fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc).date_naive());
    }
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .map(|at| at.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_outside_window_never_fires() {
        for days in [31, 35, 60, 365, -8, -10, -100] {
            assert!(!should_notify(days), "{} should not fire", days);
        }
    }

    #[test]
    fn test_early_warning_every_five_days() {
        for days in [30, 25, 20] {
            assert!(should_notify(days), "{} should fire", days);
        }
        for days in [29, 28, 27, 26, 24, 21, 19, 16] {
            assert!(!should_notify(days), "{} should not fire", days);
        }
    }

    #[test]
    fn test_mid_range_every_other_day() {
        for days in [15, 13, 11, 9] {
            assert!(should_notify(days), "{} should fire", days);
        }
        for days in [14, 12, 10, 8] {
            assert!(!should_notify(days), "{} should not fire", days);
        }
    }

    #[test]
    fn test_near_term_exact_days() {
        for days in [7, 5, 3, 1, 0] {
            assert!(should_notify(days), "{} should fire", days);
        }
        for days in [6, 4, 2] {
            assert!(!should_notify(days), "{} should not fire", days);
        }
    }

    #[test]
    fn test_post_expiry_daily_nag() {
        for days in -7..=-1 {
            assert!(should_notify(days), "{} should fire", days);
        }
        assert!(!should_notify(-8));
    }

    #[test]
    fn test_urgency_phrase() {
        assert_eq!(urgency_phrase(5), "expires in 5 days");
        assert_eq!(urgency_phrase(1), "expires in 1 day");
        assert_eq!(urgency_phrase(0), "expires today");
        assert_eq!(urgency_phrase(-1), "expired 1 day ago");
        assert_eq!(urgency_phrase(-3), "expired 3 days ago");
    }

    #[test]
    fn test_days_remaining_crosses_month() {
        assert_eq!(days_remaining(date(2026, 11, 2), date(2026, 10, 28)), 5);
        assert_eq!(days_remaining(date(2026, 10, 28), date(2026, 10, 28)), 0);
        assert_eq!(days_remaining(date(2026, 10, 25), date(2026, 10, 28)), -3);
    }

    #[test]
    fn test_time_of_day_does_not_change_the_count() {
        let today = date(2026, 10, 16);
        let morning = parse_expiry_date("2026-10-21T00:00:01Z").unwrap();
        let evening = parse_expiry_date("2026-10-21T23:59:59Z").unwrap();
        assert_eq!(days_remaining(morning, today), 5);
        assert_eq!(days_remaining(evening, today), 5);
    }

    #[test]
    fn test_parse_expiry_formats() {
        assert_eq!(parse_expiry_date("2026-03-01"), Some(date(2026, 3, 1)));
        assert_eq!(
            parse_expiry_date("2026-03-01 14:30:00"),
            Some(date(2026, 3, 1))
        );
        assert_eq!(
            parse_expiry_date("2026-03-01T14:30:00.000Z"),
            Some(date(2026, 3, 1))
        );
        assert_eq!(parse_expiry_date("01/03/2026"), None);
        assert_eq!(parse_expiry_date(""), None);
    }

    #[test]
    fn test_parse_zoneless_datetimes_sqlite_accepts() {
        for raw in [
            "2026-03-01 14:30",
            "2026-03-01T14:30",
            "2026-03-01T14:30:00.250",
            "2026-03-01 14:30:00.250",
            "2026-03-01T14:30:00",
        ] {
            assert_eq!(parse_expiry_date(raw), Some(date(2026, 3, 1)), "{}", raw);
        }
    }
}
