// Utility functions shared by handlers and services

use bson::oid::ObjectId;
use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Utc};

use crate::error::{AppError, Result};

/// Format a stored timestamp for API responses
pub fn format_datetime(dt: bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a hex document id taken from a path segment
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

/// One calendar month of the admin growth chart
#[derive(Debug, Clone, PartialEq)]
pub struct MonthWindow {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The last `months` calendar months ending with the month of `now`, oldest first
pub fn month_windows(now: DateTime<Utc>, months: u32) -> Vec<MonthWindow> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..months as i32)
        .rev()
        .filter_map(|back| {
            let index = current - back;
            let start = month_start(index)?;
            let end = month_start(index + 1)?;
            Some(MonthWindow {
                label: start.format("%b %Y").to_string(),
                start,
                end,
            })
        })
        .collect()
}

fn month_start(index: i32) -> Option<DateTime<Utc>> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_windows_cross_year_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 2, 14, 10, 0, 0).unwrap();
        let windows = month_windows(now, 3);
        let labels: Vec<_> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2025", "Jan 2026", "Feb 2026"]);
        assert_eq!(windows[0].start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(windows[0].end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(windows[2].end, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_month_windows_single_month() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let windows = month_windows(now, 1);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].label, "Dec 2026");
        assert_eq!(windows[0].end, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "user").unwrap(), id);
        assert!(matches!(
            parse_object_id("nope", "user"),
            Err(AppError::BadRequest(msg)) if msg == "Invalid user ID"
        ));
    }

    #[test]
    fn test_format_datetime_is_rfc3339() {
        let dt = bson::DateTime::from_millis(0);
        assert_eq!(format_datetime(dt), "1970-01-01T00:00:00.000Z");
    }
}
