//! Conversion between `chrono` times and SQLite `datetime('now')` text.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Layout produced by SQLite's `datetime()`; compares correctly as text.
pub const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a UTC instant the way SQLite stores `datetime('now')`.
pub fn sqlite_timestamp(at: DateTime<Utc>) -> String {
    at.format(SQLITE_TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp back into UTC.
pub fn parse_sqlite_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, SQLITE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_like_sqlite() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let text = sqlite_timestamp(at);
        assert_eq!(text, "2024-03-09 07:05:01");
        assert_eq!(parse_sqlite_timestamp(&text), Some(at));
    }

    #[test]
    fn matches_sqlite_datetime_now() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let now: String = conn
            .query_row("SELECT datetime('now')", [], |row| row.get(0))
            .unwrap();
        assert!(parse_sqlite_timestamp(&now).is_some());
    }
}
