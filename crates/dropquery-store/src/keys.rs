//! Persisted key names.
//!
//! Every key holds one JSON value in the `kv` table.

pub const DAILY_USAGE_ML: &str = "dailyUsageMl";
pub const WEEKLY_USAGE_ML: &str = "weeklyUsageMl";
pub const TOTAL_USAGE_ML: &str = "totalUsageMl";
pub const HISTORY: &str = "history";
pub const DAILY_HISTORY: &str = "dailyHistory";
pub const AVERAGE_USAGE_ML: &str = "averageUsageMl";
pub const DISPLAY_UNIT: &str = "displayUnit";

pub const SURVEY_COMPLETED: &str = "surveyCompleted";
pub const RESET_IN_PROGRESS: &str = "resetInProgress";
pub const USER_ID: &str = "userId";

/// Keys making up the ledger state document.
pub const LEDGER_KEYS: &[&str] = &[
    DAILY_USAGE_ML,
    WEEKLY_USAGE_ML,
    TOTAL_USAGE_ML,
    HISTORY,
    DAILY_HISTORY,
    AVERAGE_USAGE_ML,
    DISPLAY_UNIT,
];

/// Keys making up the app flags document.
pub const FLAG_KEYS: &[&str] = &[SURVEY_COMPLETED, RESET_IN_PROGRESS, USER_ID];
