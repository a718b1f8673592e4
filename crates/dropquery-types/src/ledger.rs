//! Persisted usage-ledger data model.
//!
//! These are plain data types; the accounting rules that mutate them live in
//! `dropquery-core`. All volumes are canonical milliliters.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::model::ModelTag;
use crate::units::DisplayUnit;

/// One detected query. Immutable once appended to the history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UsageRecord {
    /// Device-local calendar date the query was recorded on.
    #[cfg_attr(feature = "serde", serde(with = "calendar_date"))]
    pub date: Date,
    /// Service the query was attributed to.
    pub model: ModelTag,
    /// Estimated volume in ml.
    pub water_usage_ml: f64,
    /// Instant of recording.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

/// Archived total of one past day.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DailyTotal {
    #[cfg_attr(feature = "serde", serde(with = "calendar_date"))]
    pub date: Date,
    pub usage_ml: f64,
}

/// Singleton usage-accounting state.
///
/// Created lazily with zeros; every field defaults when missing from storage.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct LedgerState {
    pub daily_usage_ml: f64,
    pub weekly_usage_ml: f64,
    pub total_usage_ml: f64,
    pub history: Vec<UsageRecord>,
    pub daily_history: Vec<DailyTotal>,
    pub average_usage_ml: f64,
    pub display_unit: DisplayUnit,
}

impl LedgerState {
    /// Most recently appended record.
    #[must_use]
    pub fn last_record(&self) -> Option<&UsageRecord> {
        self.history.last()
    }

    /// Sum of every retained history record.
    #[must_use]
    pub fn history_sum(&self) -> f64 {
        self.history.iter().map(|r| r.water_usage_ml).sum()
    }

    /// Sum of the history records dated `date`.
    #[must_use]
    pub fn usage_on(&self, date: Date) -> f64 {
        self.history
            .iter()
            .filter(|r| r.date == date)
            .map(|r| r.water_usage_ml)
            .sum()
    }

    /// Whether the ledger has never recorded anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.daily_history.is_empty() && self.total_usage_ml == 0.0
    }
}

/// Flags persisted next to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AppFlags {
    /// Onboarding survey finished; gates whether the UI is shown.
    pub survey_completed: bool,
    /// Set for the duration of a reset.
    pub reset_in_progress: bool,
    /// Anonymous sync identity.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub user_id: Option<String>,
}

/// Read-only view of the ledger for display.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LedgerSummary {
    /// Today's usage; 0 when nothing was recorded today.
    pub daily_usage_ml: f64,
    pub weekly_usage_ml: f64,
    pub total_usage_ml: f64,
    pub average_usage_ml: f64,
    /// Number of retained history records.
    pub query_count: usize,
    /// Number of retained records dated today.
    pub queries_today: usize,
    pub display_unit: DisplayUnit,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_record: Option<UsageRecord>,
}

/// `YYYY-MM-DD`, the only date form stored or accepted.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Format a date as `YYYY-MM-DD`.
///
/// ```
/// use dropquery_types::ledger::format_date;
/// use time::macros::date;
///
/// assert_eq!(format_date(date!(2024 - 03 - 07)), "2024-03-07");
/// ```
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// Parse a `YYYY-MM-DD` date with zero-padded fields and no sign.
pub fn parse_date(s: &str) -> ParseResult<Date> {
    let invalid = || ParseError::InvalidDate(s.to_string());
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid());
    }
    Date::parse(s, DATE_FORMAT).map_err(|_| invalid())
}

#[cfg(feature = "serde")]
pub(crate) mod calendar_date {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn record(date: Date, ml: f64) -> UsageRecord {
        UsageRecord {
            date,
            model: ModelTag::ChatGpt,
            water_usage_ml: ml,
            timestamp: datetime!(2024-01-15 12:00 UTC),
        }
    }

    #[test]
    fn test_date_format_and_parse() {
        assert_eq!(format_date(date!(2024 - 01 - 05)), "2024-01-05");
        assert_eq!(parse_date("2024-01-05"), Ok(date!(2024 - 01 - 05)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("2024-01").is_err());
        assert!(parse_date("2024-1-5").is_err());
        assert!(parse_date("+2024-01-05").is_err());
        assert!(parse_date(" 2024-01-05").is_err());
        assert!(parse_date("2024-01-05T00:00").is_err());
    }

    #[test]
    fn test_usage_record_json_shape() {
        let json = serde_json::to_value(record(date!(2024 - 01 - 15), 0.322)).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["model"], "chatgpt");
        assert_eq!(json["waterUsageMl"], 0.322);
        assert_eq!(json["timestamp"], "2024-01-15T12:00:00Z");
    }

    #[test]
    fn test_usage_record_rejects_unpadded_date() {
        let json = r#"{"date":"2024-1-5","model":"chatgpt","waterUsageMl":0.322,"timestamp":"2024-01-05T12:00:00Z"}"#;
        assert!(serde_json::from_str::<UsageRecord>(json).is_err());
        let json = json.replace("2024-1-5", "2024-01-05");
        let record: UsageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.date, date!(2024 - 01 - 05));
    }

    #[test]
    fn test_ledger_state_defaults_missing_fields() {
        let state: LedgerState = serde_json::from_str(r#"{"totalUsageMl": 4.5}"#).unwrap();
        assert_eq!(state.total_usage_ml, 4.5);
        assert_eq!(state.daily_usage_ml, 0.0);
        assert!(state.history.is_empty());
        assert_eq!(state.display_unit, DisplayUnit::Milliliters);
    }

    #[test]
    fn test_ledger_state_round_trip() {
        let state = LedgerState {
            daily_usage_ml: 1.0,
            weekly_usage_ml: 1.0,
            total_usage_ml: 3.0,
            history: vec![record(date!(2024 - 01 - 15), 1.0)],
            daily_history: vec![DailyTotal {
                date: date!(2024 - 01 - 14),
                usage_ml: 2.0,
            }],
            average_usage_ml: 2.0,
            display_unit: DisplayUnit::Ounces,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"dailyHistory\""));
        let back: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_state_helpers() {
        let state = LedgerState {
            history: vec![
                record(date!(2024 - 01 - 14), 1.0),
                record(date!(2024 - 01 - 15), 2.0),
                record(date!(2024 - 01 - 15), 0.5),
            ],
            ..Default::default()
        };
        assert_eq!(state.history_sum(), 3.5);
        assert_eq!(state.usage_on(date!(2024 - 01 - 15)), 2.5);
        assert_eq!(state.last_record().unwrap().water_usage_ml, 0.5);
        assert!(!state.is_empty());
        assert!(LedgerState::default().is_empty());
    }

    #[test]
    fn test_flags_skip_missing_user_id() {
        let json = serde_json::to_string(&AppFlags::default()).unwrap();
        assert_eq!(json, r#"{"surveyCompleted":false,"resetInProgress":false}"#);
    }
}
