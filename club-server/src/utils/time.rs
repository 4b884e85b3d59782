//! Time helpers
//!
//! Venue nights span midnight: a roster span of 22:00 → 04:00 is six hours,
//! not minus eighteen. Dates are venue-local (`Config::timezone`).

use crate::utils::{AppError, AppResult};
use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

/// Parse a wall-clock time in HH:MM
pub fn parse_clock(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| AppError::validation(format!("Invalid time '{value}', expected HH:MM")))
}

/// Parse a date in YYYY-MM-DD
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date '{value}', expected YYYY-MM-DD")))
}

/// Worked hours between two wall-clock times; an end before the start means
/// the span crosses midnight
pub fn span_hours(starts_at: &str, ends_at: &str) -> AppResult<f64> {
    let start = parse_clock(starts_at)?;
    let end = parse_clock(ends_at)?;

    let start_min = (start.hour() * 60 + start.minute()) as i64;
    let mut end_min = (end.hour() * 60 + end.minute()) as i64;
    if end_min < start_min {
        end_min += 24 * 60;
    }

    Ok((end_min - start_min) as f64 / 60.0)
}

/// Today's date in the venue timezone (YYYY-MM-DD)
pub fn today_in(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string()
}

/// Current wall-clock time in the venue timezone (HH:MM)
pub fn clock_now(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%H:%M").to_string()
}

/// Hours expressed in milliseconds
pub fn hours_to_millis(hours: i64) -> i64 {
    hours * 60 * 60 * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_within_a_day() {
        assert_eq!(span_hours("10:00", "18:30").unwrap(), 8.5);
    }

    #[test]
    fn span_crossing_midnight() {
        assert_eq!(span_hours("22:00", "04:00").unwrap(), 6.0);
        assert_eq!(span_hours("23:30", "00:30").unwrap(), 1.0);
    }

    #[test]
    fn equal_times_are_zero_hours() {
        assert_eq!(span_hours("20:00", "20:00").unwrap(), 0.0);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(span_hours("22h00", "04:00").is_err());
        assert!(parse_date("01-06-2025").is_err());
        assert!(parse_date("2025-06-01").is_ok());
    }
}
