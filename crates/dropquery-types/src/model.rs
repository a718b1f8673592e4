//! AI model tags and the per-model volume estimate table.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Short identifier of the AI service a query was attributed to.
///
/// [`ModelTag::AiService`] is the generic fallback when no more specific
/// service could be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ModelTag {
    ChatGpt,
    Gemini,
    Claude,
    Perplexity,
    Copilot,
    Cohere,
    HuggingFace,
    Stability,
    Replicate,
    Together,
    Groq,
    Mistral,
    Character,
    You,
    Poe,
    #[cfg_attr(feature = "serde", serde(rename = "ai-service"))]
    AiService,
}

impl ModelTag {
    /// Every tag, in declaration order.
    pub const ALL: [ModelTag; 16] = [
        ModelTag::ChatGpt,
        ModelTag::Gemini,
        ModelTag::Claude,
        ModelTag::Perplexity,
        ModelTag::Copilot,
        ModelTag::Cohere,
        ModelTag::HuggingFace,
        ModelTag::Stability,
        ModelTag::Replicate,
        ModelTag::Together,
        ModelTag::Groq,
        ModelTag::Mistral,
        ModelTag::Character,
        ModelTag::You,
        ModelTag::Poe,
        ModelTag::AiService,
    ];

    /// Stored name of the tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTag::ChatGpt => "chatgpt",
            ModelTag::Gemini => "gemini",
            ModelTag::Claude => "claude",
            ModelTag::Perplexity => "perplexity",
            ModelTag::Copilot => "copilot",
            ModelTag::Cohere => "cohere",
            ModelTag::HuggingFace => "huggingface",
            ModelTag::Stability => "stability",
            ModelTag::Replicate => "replicate",
            ModelTag::Together => "together",
            ModelTag::Groq => "groq",
            ModelTag::Mistral => "mistral",
            ModelTag::Character => "character",
            ModelTag::You => "you",
            ModelTag::Poe => "poe",
            ModelTag::AiService => "ai-service",
        }
    }

    /// Parse a tag, mapping anything unknown to [`ModelTag::AiService`].
    ///
    /// ```
    /// use dropquery_types::ModelTag;
    ///
    /// assert_eq!(ModelTag::parse_lenient("Claude"), ModelTag::Claude);
    /// assert_eq!(ModelTag::parse_lenient("grok-9000"), ModelTag::AiService);
    /// ```
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(ModelTag::AiService)
    }
}

impl fmt::Display for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTag {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ModelTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| ParseError::UnknownModel(s.to_string()))
    }
}

/// Default estimate for a query to an unrecognized service, in ml.
pub const DEFAULT_QUERY_VOLUME_ML: f64 = 0.3;

/// Fixed per-model volume estimates, in ml per query.
///
/// Text length never scales the estimate. Models missing from `models`
/// fall back to `default_ml`.
///
/// # Example
///
/// ```
/// use dropquery_types::{ModelTag, VolumeEstimates};
///
/// let estimates = VolumeEstimates::default();
/// assert_eq!(estimates.estimate(ModelTag::ChatGpt), 0.322);
/// assert_eq!(estimates.estimate(ModelTag::Poe), estimates.default_ml);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VolumeEstimates {
    /// Estimate used for models without their own entry.
    pub default_ml: f64,
    /// Per-model overrides.
    pub models: BTreeMap<ModelTag, f64>,
}

impl Default for VolumeEstimates {
    fn default() -> Self {
        let models = BTreeMap::from([
            (ModelTag::ChatGpt, 0.322),
            (ModelTag::Gemini, 0.26),
            (ModelTag::Claude, 0.3),
            (ModelTag::Perplexity, 0.31),
            (ModelTag::Copilot, 0.322),
            (ModelTag::Mistral, 0.28),
            (ModelTag::Groq, 0.25),
        ]);
        Self {
            default_ml: DEFAULT_QUERY_VOLUME_ML,
            models,
        }
    }
}

impl VolumeEstimates {
    /// Estimated volume for one query to `model`.
    #[must_use]
    pub fn estimate(&self, model: ModelTag) -> f64 {
        self.models.get(&model).copied().unwrap_or(self.default_ml)
    }

    /// Names of entries that are not finite and non-negative.
    #[must_use]
    pub fn invalid_entries(&self) -> Vec<String> {
        let mut invalid = Vec::new();
        if !is_valid_volume(self.default_ml) {
            invalid.push("default_ml".to_string());
        }
        for (model, volume) in &self.models {
            if !is_valid_volume(*volume) {
                invalid.push(model.to_string());
            }
        }
        invalid
    }
}

/// Whether `volume_ml` can be recorded: finite and not negative.
#[must_use]
pub fn is_valid_volume(volume_ml: f64) -> bool {
    volume_ml.is_finite() && volume_ml >= 0.0
}
