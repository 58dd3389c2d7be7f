//! Timestamp formats used in the tables.
//!
//! Two formats coexist: the "date added" style columns carry a local
//! `YYYY-MM-DD HH:MM:SS` string, while note timestamps are UTC ISO-8601 with
//! microseconds. Note timestamps drive "latest" and "most recent", so they
//! stay in one offset and sort lexicographically in chronological order even
//! across DST changes. Both start with the `YYYY-MM-DD` date portion used by
//! date-range queries.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use std::time::SystemTime;

pub const DATE_ADDED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time in the "date added" format.
pub fn date_added_now() -> String {
    Local::now().format(DATE_ADDED_FORMAT).to_string()
}

/// Current UTC time as an ISO-8601 timestamp (`...Z`).
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Format a filesystem time in the "date added" format.
pub fn format_system_time(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    local.format(DATE_ADDED_FORMAT).to_string()
}

/// The `YYYY-MM-DD` prefix of a timestamp, or the whole string if shorter.
pub fn date_part(stamp: &str) -> &str {
    stamp.get(..10).unwrap_or(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_part_takes_prefix() {
        assert_eq!(date_part("2024-03-05T10:11:12.000001+01:00"), "2024-03-05");
        assert_eq!(date_part("2024-03-05 10:11:12"), "2024-03-05");
        assert_eq!(date_part("2024"), "2024");
    }

    #[test]
    fn formats_sort_chronologically() {
        let earlier = iso_now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = iso_now();
        assert!(earlier < later);
        assert!(later.ends_with('Z'), "{later}");
        assert_eq!(date_added_now().len(), 19);
    }
}
