//! Onboarding survey answers and the baseline they imply.

use serde::{Deserialize, Serialize};

/// Daily baseline before multipliers: ~100 queries at ~0.3 ml.
pub const BASE_DAILY_ML: f64 = 30.0;

/// How often the user says they use AI assistants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageFrequency {
    Daily,
    #[default]
    Sometimes,
    Never,
}

impl UsageFrequency {
    fn multiplier(self) -> f64 {
        match self {
            UsageFrequency::Daily => 2.0,
            UsageFrequency::Sometimes => 0.7,
            UsageFrequency::Never => 0.1,
        }
    }
}

/// What the user mostly uses assistants for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsagePurpose {
    Roleplay,
    Discussion,
    Tool,
    #[default]
    Other,
}

impl UsagePurpose {
    fn multiplier(self) -> f64 {
        match self {
            UsagePurpose::Roleplay => 1.5,
            UsagePurpose::Discussion => 1.2,
            UsagePurpose::Tool => 0.8,
            UsagePurpose::Other => 1.0,
        }
    }
}

/// Answers collected by the onboarding survey.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    pub usage_frequency: UsageFrequency,
    pub usage_purpose: UsagePurpose,
    /// Daily screen time in hours.
    pub screen_time_hours: f64,
    /// Free-form awareness answer, passed through to sync untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_awareness: Option<String>,
}

impl SurveyAnswers {
    /// Self-reported daily baseline in whole ml.
    ///
    /// ```
    /// use dropquery_core::onboarding::{SurveyAnswers, UsageFrequency, UsagePurpose};
    ///
    /// let answers = SurveyAnswers {
    ///     usage_frequency: UsageFrequency::Daily,
    ///     usage_purpose: UsagePurpose::Tool,
    ///     screen_time_hours: 8.0,
    ///     water_awareness: None,
    /// };
    /// assert_eq!(answers.estimate_baseline_ml(), 48.0);
    /// ```
    pub fn estimate_baseline_ml(&self) -> f64 {
        let screen = if self.screen_time_hours.is_finite() {
            (self.screen_time_hours.max(0.0) / 8.0).min(1.5)
        } else {
            0.0
        };
        (BASE_DAILY_ML
            * self.usage_frequency.multiplier()
            * self.usage_purpose.multiplier()
            * screen)
            .round()
    }
}
