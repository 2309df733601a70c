//! Canonical calendar-date handling. Every path that needs "today" — menu
//! lookups, attendance reads and writes, dashboard counters — goes through
//! these helpers so the server never mixes UTC-derived and local-derived
//! date strings.

use chrono::{Local, NaiveDate};

use crate::error::ApiError;

pub const DATE_FMT: &str = "%Y-%m-%d";

/// The server-local calendar date.
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, DATE_FMT).map_err(|_| {
        ApiError::Validation(format!("Invalid date '{raw}'. Expected YYYY-MM-DD."))
    })
}

/// Full weekday label, e.g. "Wednesday". Menus store this denormalized.
pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Short weekday label, e.g. "Wed", for the attendance trend view.
pub fn short_day_name(date: NaiveDate) -> String {
    date.format("%a").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_iso_dates_only() {
        assert_eq!(
            parse_date("2024-01-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert!(parse_date("10-01-2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn day_names_derive_from_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(day_name(date), "Wednesday");
        assert_eq!(short_day_name(date), "Wed");
        assert_eq!(format_date(date), "2024-01-10");
    }
}
