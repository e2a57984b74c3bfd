//! Comment banners, header and footer of a dump.
//!
//! These lines are a compatibility contract for tools that parse dumps:
//! banners are exactly [`BANNER_WIDTH`] characters wide.

use std::time::Duration;

use chrono::NaiveDateTime;

/// Width of a `-- LABEL ----` banner line.
pub const BANNER_WIDTH: usize = 50;

/// `-- <label> ` padded with dashes to [`BANNER_WIDTH`], plus a blank line.
pub fn banner(label: &str) -> String {
    let mut line = format!("-- {} ", label);
    let width = line.chars().count();
    if width < BANNER_WIDTH {
        line.push_str(&"-".repeat(BANNER_WIDTH - width));
    }
    line.push_str("\n\n");
    line
}

/// Opening comment naming the database and the run start time.
pub fn header(database: &str, started_at: NaiveDateTime) -> String {
    format!(
        "/* BACKUP — {} — {} */\n\n",
        database,
        started_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Closing banner with the elapsed run time.
pub fn footer(elapsed: Duration) -> String {
    banner(&format!("ELAPSED {}", format_elapsed(elapsed)))
}

/// `HH:MM:SS.ffff`: fraction truncated to four digits, trailing zeros and
/// an all-zero fraction omitted.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);

    let fraction = format!("{:04}", elapsed.subsec_micros() / 100);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}.{}", hours, minutes, seconds, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_banner_is_fifty_wide() {
        for label in ["CREATE DB", "DROP TABLES", "FOREIGN KEYS", "ELAPSED 00:00:01.25"] {
            let banner = banner(label);
            let line = banner.strip_suffix("\n\n").unwrap();
            assert_eq!(line.chars().count(), BANNER_WIDTH, "{:?}", line);
            assert!(line.starts_with(&format!("-- {} -", label)));
        }
    }

    #[test]
    fn test_banner_exact_text() {
        assert_eq!(
            banner("CREATE TABLES"),
            "-- CREATE TABLES ---------------------------------\n\n"
        );
    }

    #[test]
    fn test_long_label_is_not_padded() {
        let label = "X".repeat(60);
        assert_eq!(banner(&label), format!("-- {} \n\n", label));
    }

    #[test]
    fn test_header() {
        let started = NaiveDate::from_ymd_opt(2017, 5, 7)
            .unwrap()
            .and_hms_opt(9, 8, 7)
            .unwrap();
        assert_eq!(
            header("acme", started),
            "/* BACKUP — acme — 2017-05-07 09:08:07 */\n\n"
        );
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "00:00:01.5");
        assert_eq!(format_elapsed(Duration::from_micros(3_723_123_456)), "01:02:03.1234");
        assert_eq!(format_elapsed(Duration::from_micros(50_000)), "00:00:00.05");
        assert_eq!(format_elapsed(Duration::from_micros(10)), "00:00:00");
    }

    #[test]
    fn test_footer() {
        assert!(footer(Duration::from_millis(250)).starts_with("-- ELAPSED 00:00:00.25 ---"));
    }
}
