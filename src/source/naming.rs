//! Hourly dump naming convention
//!
//! Files are named `pageviews-YYYYMMDD-HH0000.gz` and live under
//! `{base_url}/{YYYY}/{YYYY}-{MM}/`.

use crate::error::StreamError;
use chrono::{NaiveDateTime, Timelike};
use regex::Regex;
use std::sync::OnceLock;

/// Public Wikimedia dumps host
pub const BASE_URL: &str = "https://dumps.wikimedia.org/other/pageviews/";

static RE_FILENAME: OnceLock<Regex> = OnceLock::new();

fn filename_regex() -> &'static Regex {
    RE_FILENAME.get_or_init(|| {
        Regex::new(r"^pageviews-(\d{4})(\d{2})\d{2}-\d{2}0000\.gz$")
            .expect("filename pattern is valid")
    })
}

/// Filename for the hour containing `timestamp`. Minutes and seconds are dropped.
pub fn filename_from_timestamp(timestamp: &NaiveDateTime) -> String {
    format!(
        "pageviews-{}-{:02}0000.gz",
        timestamp.format("%Y%m%d"),
        timestamp.hour()
    )
}

/// Full download URL for a dump filename
pub fn url_from_filename(base_url: &str, filename: &str) -> Result<String, StreamError> {
    let caps = filename_regex()
        .captures(filename)
        .ok_or_else(|| StreamError::InvalidFilename(filename.to_string()))?;
    let (year, month) = (&caps[1], &caps[2]);

    let separator = if base_url.ends_with('/') { "" } else { "/" };
    Ok(format!(
        "{base_url}{separator}{year}/{year}-{month}/{filename}"
    ))
}

/// Whether `filename` follows the hourly naming convention
pub fn is_valid_filename(filename: &str) -> bool {
    filename_regex().is_match(filename)
}

/// Parse a timestamp given on the command line or in config.
///
/// Accepts RFC 3339 (`2024-01-15T10:30:00Z`) as well as the shorter
/// `2024-01-15T10`, `2024-01-15T10:30` and `2024-01-15T10:30:00` forms.
/// Returns `None` for anything else so callers can fall back to treating
/// the input as a filename.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }

    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }

    // Hour-only form, which chrono cannot parse into a NaiveDateTime directly
    let (date, hour) = input.split_once('T')?;
    let hour: u32 = hour.parse().ok()?;
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(hour, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_filename_from_timestamp() {
        assert_eq!(
            filename_from_timestamp(&ts(2024, 1, 5, 7, 45)),
            "pageviews-20240105-070000.gz"
        );
        assert_eq!(
            filename_from_timestamp(&ts(2023, 12, 31, 23, 0)),
            "pageviews-20231231-230000.gz"
        );
    }

    #[test]
    fn test_url_from_filename() {
        let url = url_from_filename(BASE_URL, "pageviews-20240105-070000.gz").unwrap();
        assert_eq!(
            url,
            "https://dumps.wikimedia.org/other/pageviews/2024/2024-01/pageviews-20240105-070000.gz"
        );
    }

    #[test]
    fn test_url_adds_missing_slash() {
        let url = url_from_filename("http://localhost:8080/dumps", "pageviews-20231231-230000.gz")
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:8080/dumps/2023/2023-12/pageviews-20231231-230000.gz"
        );
    }

    #[test]
    fn test_rejects_invalid_filename() {
        for bad in ["", "pageviews-2024010-070000.gz", "pageviews-20240105-073000.gz", "notes.txt"] {
            assert!(matches!(
                url_from_filename(BASE_URL, bad),
                Err(StreamError::InvalidFilename(_))
            ));
            assert!(!is_valid_filename(bad));
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = ts(2024, 1, 15, 10, 0);
        assert_eq!(parse_timestamp("2024-01-15T10"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("pageviews-20240115-100000.gz"), None);
    }
}
