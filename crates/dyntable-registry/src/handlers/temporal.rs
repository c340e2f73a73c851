use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use dyntable_core::CellValue;
use serde_json::Value;

use super::ColumnTypeHandler;
use crate::outcome::ValidationOutcome;

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"];
const TIME_INPUT_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];
const DATETIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text.trim(), fmt).ok())
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text.trim(), fmt).ok())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
}

/// Calendar dates, stored as `YYYY-MM-DD`.
pub struct DateHandler;

impl ColumnTypeHandler for DateHandler {
    fn type_id(&self) -> &str {
        "date"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if parse_date(text).is_some() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion("Invalid date format", "Use YYYY-MM-DD"),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match parse_date(input) {
            Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
            None => CellValue::Text(input.trim().to_string()),
        }
    }
}

/// Clock times, stored as `HH:MM:SS`.
pub struct TimeHandler;

impl ColumnTypeHandler for TimeHandler {
    fn type_id(&self) -> &str {
        "time"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if parse_time(text).is_some() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion("Invalid time format", "Use HH:MM or HH:MM:SS"),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match parse_time(input) {
            Some(time) => CellValue::Text(time.format("%H:%M:%S").to_string()),
            None => CellValue::Text(input.trim().to_string()),
        }
    }
}

/// Date-times, stored as `YYYY-MM-DDTHH:MM:SS`.
pub struct DatetimeHandler;

impl ColumnTypeHandler for DatetimeHandler {
    fn type_id(&self) -> &str {
        "datetime"
    }

    fn validate(&self, value: &CellValue, _options: Option<&Value>) -> ValidationOutcome {
        match value.as_str() {
            Some(text) if parse_datetime(text).is_some() => ValidationOutcome::ok(),
            _ => ValidationOutcome::fail_with_suggestion(
                "Invalid date/time format",
                "Use YYYY-MM-DD HH:MM:SS",
            ),
        }
    }

    fn parse(&self, input: &str, _options: Option<&Value>) -> CellValue {
        match parse_datetime(input) {
            Some(datetime) => CellValue::Text(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Text(input.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_normalize_to_iso() {
        assert_eq!(
            DateHandler.parse("01/31/2026", None),
            CellValue::from("2026-01-31")
        );
        assert!(DateHandler.validate(&CellValue::from("2026-01-31"), None).valid);
        assert!(!DateHandler.validate(&CellValue::from("31st of Jan"), None).valid);
    }

    #[test]
    fn times_gain_seconds() {
        assert_eq!(TimeHandler.parse("09:30", None), CellValue::from("09:30:00"));
        assert!(!TimeHandler.validate(&CellValue::from("25:99"), None).valid);
    }

    #[test]
    fn datetimes_round_trip_their_stored_form() {
        let stored = DatetimeHandler.parse("2026-01-31 09:30", None);
        assert_eq!(stored, CellValue::from("2026-01-31T09:30:00"));
        let shown = DatetimeHandler.format(&stored, None);
        assert_eq!(DatetimeHandler.parse(&shown, None), stored);
    }
}
