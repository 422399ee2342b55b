//! Regular-session market hours.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};

/// US regular session open, UTC.
const OPEN_HOUR: u32 = 14;
const OPEN_MINUTE: u32 = 30;
/// US regular session close, UTC.
const CLOSE_HOUR: u32 = 21;

/// Whether the regular equities session is open at the given instant.
///
/// Monday through Friday, 14:30-21:00 UTC. Holidays are not modeled;
/// a closed-holiday order simply gets rejected by the venue.
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    match now.weekday() {
        Weekday::Sat | Weekday::Sun => return false,
        _ => {}
    }
    let t = now.time();
    let open = match NaiveTime::from_hms_opt(OPEN_HOUR, OPEN_MINUTE, 0) {
        Some(t) => t,
        None => return false,
    };
    t >= open && t.hour() < CLOSE_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_weekday_session_open() {
        // Wednesday
        assert!(is_market_open(at(2026, 8, 26, 15, 0)));
        assert!(is_market_open(at(2026, 8, 26, 14, 30)));
        assert!(is_market_open(at(2026, 8, 26, 20, 59)));
    }

    #[test]
    fn test_outside_session_closed() {
        assert!(!is_market_open(at(2026, 8, 26, 14, 29)));
        assert!(!is_market_open(at(2026, 8, 26, 21, 0)));
        assert!(!is_market_open(at(2026, 8, 26, 3, 0)));
    }

    #[test]
    fn test_weekend_closed() {
        // Saturday / Sunday midday
        assert!(!is_market_open(at(2026, 8, 29, 16, 0)));
        assert!(!is_market_open(at(2026, 8, 30, 16, 0)));
    }
}
