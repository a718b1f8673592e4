//! Configuration file management.
//!
//! The file lives at `<config_dir>/dropquery/config.toml` unless `--config`
//! points elsewhere. Every section and field is optional.
//!
//! ```toml
//! [ledger]
//! throttle_window_ms = 1500
//!
//! [estimates]
//! default_ml = 0.3
//! models = { chatgpt = 0.322, claude = 0.3 }
//!
//! [sync]
//! enabled = true
//! base_url = "https://sync.example.org"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dropquery_core::{EquivalenceConstants, LedgerConfig, SyncConfig};
use dropquery_types::throttle::DEFAULT_WINDOW_MS;
use dropquery_types::{ModelTag, VolumeEstimates, is_valid_volume};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSection,

    #[serde(default)]
    pub estimates: EstimatesSection,

    /// Equivalence constants used in impact messages.
    #[serde(default)]
    pub messaging: EquivalenceConstants,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub storage: StorageSection,
}

/// Gate window and ledger retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSection {
    /// Candidates within this many ms of the last admitted one are collapsed.
    #[serde(default = "default_throttle_window_ms")]
    pub throttle_window_ms: u64,

    #[serde(default = "default_retention_days")]
    pub retention_days: u16,

    #[serde(default = "default_daily_history_cap")]
    pub daily_history_cap: usize,

    #[serde(default = "default_average_window")]
    pub average_window: usize,
}

fn default_throttle_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_retention_days() -> u16 {
    LedgerConfig::default().retention_days
}

fn default_daily_history_cap() -> usize {
    LedgerConfig::default().daily_history_cap
}

fn default_average_window() -> usize {
    LedgerConfig::default().average_window
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            throttle_window_ms: default_throttle_window_ms(),
            retention_days: default_retention_days(),
            daily_history_cap: default_daily_history_cap(),
            average_window: default_average_window(),
        }
    }
}

impl LedgerSection {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            retention_days: self.retention_days,
            daily_history_cap: self.daily_history_cap,
            average_window: self.average_window,
        }
    }
}

/// Per-query volume estimates, keyed by model name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatesSection {
    #[serde(default = "default_volume_ml")]
    pub default_ml: f64,

    #[serde(default = "default_model_volumes")]
    pub models: BTreeMap<String, f64>,
}

fn default_volume_ml() -> f64 {
    VolumeEstimates::default().default_ml
}

fn default_model_volumes() -> BTreeMap<String, f64> {
    VolumeEstimates::default()
        .models
        .into_iter()
        .map(|(model, ml)| (model.to_string(), ml))
        .collect()
}

impl Default for EstimatesSection {
    fn default() -> Self {
        Self {
            default_ml: default_volume_ml(),
            models: default_model_volumes(),
        }
    }
}

impl EstimatesSection {
    /// Build the estimate table. Entries with unknown model names are skipped.
    pub fn volume_estimates(&self) -> VolumeEstimates {
        let models = self
            .models
            .iter()
            .filter_map(|(name, ml)| name.parse::<ModelTag>().ok().map(|model| (model, *ml)))
            .collect();
        VolumeEstimates {
            default_ml: self.default_ml,
            models,
        }
    }
}

/// Remote sync backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl SyncSection {
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(&self.base_url);
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.queue_capacity = self.queue_capacity;
        match &self.api_key {
            Some(key) => config.api_key(key),
            None => config,
        }
    }
}

/// Ledger database location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "dropquery_store::default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: dropquery_store::default_db_path(),
        }
    }
}

/// A single invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dropquery")
            .join("config.toml")
    }

    /// Load the default config file, or defaults if it does not exist.
    pub fn load_default() -> Result<Self> {
        Self::load_or_default(&Self::default_path())
    }

    /// Load `path`, or defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Collect every invalid value.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.ledger.throttle_window_ms == 0 {
            errors.push(ValidationError {
                field: "ledger.throttle_window_ms".to_string(),
                message: "throttle window must be greater than 0".to_string(),
            });
        }
        if self.ledger.daily_history_cap == 0 {
            errors.push(ValidationError {
                field: "ledger.daily_history_cap".to_string(),
                message: "must keep at least one archived day".to_string(),
            });
        }
        if self.ledger.average_window == 0 {
            errors.push(ValidationError {
                field: "ledger.average_window".to_string(),
                message: "must average at least one day".to_string(),
            });
        }

        if !is_valid_volume(self.estimates.default_ml) {
            errors.push(ValidationError {
                field: "estimates.default_ml".to_string(),
                message: format!("invalid volume {}", self.estimates.default_ml),
            });
        }
        for (name, ml) in &self.estimates.models {
            let field = format!("estimates.models.{}", name);
            if name.parse::<ModelTag>().is_err() {
                errors.push(ValidationError {
                    field,
                    message: format!("unknown model '{}'", name),
                });
            } else if !is_valid_volume(*ml) {
                errors.push(ValidationError {
                    field,
                    message: format!("invalid volume {}", ml),
                });
            }
        }

        if let Err(e) = self.messaging.validate() {
            errors.push(ValidationError {
                field: "messaging".to_string(),
                message: e.to_string(),
            });
        }

        if self.sync.enabled {
            let url = self.sync.base_url.trim();
            if url.is_empty() {
                errors.push(ValidationError {
                    field: "sync.base_url".to_string(),
                    message: "base URL is required when sync is enabled".to_string(),
                });
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: "sync.base_url".to_string(),
                    message: format!("URL must start with http:// or https://, got '{}'", url),
                });
            }
            if self.sync.queue_capacity == 0 {
                errors.push(ValidationError {
                    field: "sync.queue_capacity".to_string(),
                    message: "queue capacity must be greater than 0".to_string(),
                });
            }
        }

        if self.storage.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.ledger.throttle_window_ms, 1500);
        assert_eq!(config.estimates.volume_estimates(), VolumeEstimates::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [ledger]
            retention_days = 3

            [estimates]
            models = { claude = 0.5 }

            [messaging]
            child_ml = 1000.0
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.retention_days, 3);
        assert_eq!(config.ledger.average_window, 7);
        let estimates = config.estimates.volume_estimates();
        assert_eq!(estimates.estimate(ModelTag::Claude), 0.5);
        // Replacing the table drops the built-in entries.
        assert_eq!(estimates.estimate(ModelTag::ChatGpt), 0.3);
        assert_eq!(config.messaging.child_ml, 1000.0);
        assert_eq!(config.messaging.adult_ml, 3200.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.sync.enabled = true;
        config.sync.base_url = "https://sync.example.org".to_string();
        config.sync.api_key = Some("anon".to_string());
        config.storage.path = dir.path().join("ledger.db");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ledger\nretention_days = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = Config::default();
        config.ledger.throttle_window_ms = 0;
        config.ledger.average_window = 0;
        config.estimates.default_ml = -1.0;
        config.estimates.models.insert("grok".to_string(), 0.4);
        config.estimates.models.insert("claude".to_string(), f64::NAN);
        config.messaging.cat_ml = 0.0;
        config.sync.enabled = true;

        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "ledger.throttle_window_ms",
                "ledger.average_window",
                "estimates.default_ml",
                "estimates.models.claude",
                "estimates.models.grok",
                "messaging",
                "sync.base_url",
            ]
        );
    }

    #[test]
    fn test_sync_url_scheme_checked_only_when_enabled() {
        let mut config = Config::default();
        config.sync.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_empty());
        config.sync.enabled = true;
        assert_eq!(config.validate()[0].field, "sync.base_url");
    }

    #[test]
    fn test_sync_config_conversion() {
        let section = SyncSection {
            enabled: true,
            base_url: "https://sync.example.org".to_string(),
            api_key: Some("key".to_string()),
            timeout_secs: 3,
            queue_capacity: 8,
        };
        let config = section.sync_config();
        assert_eq!(config.base_url, "https://sync.example.org");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.queue_capacity, 8);
    }
}
