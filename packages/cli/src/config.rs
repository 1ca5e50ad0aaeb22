//! Pipeline configuration file.
//!
//! Every field has a default, so an empty (or absent) file is valid.

use std::path::{Path, PathBuf};

use crash_injury_analytics::DEFAULT_CRASH_TYPE_MIN_TOTAL;
use crash_injury_model_models::ModelConfig;
use crash_injury_source::registry::DEFAULT_DATASET;
use crash_injury_source::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory charts, CSV exports and the model artifact are written to.
    pub output_dir: PathBuf,
    /// Data acquisition.
    pub source: SourceConfig,
    /// Exploratory views.
    pub explore: ExploreConfig,
    /// Model training.
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            source: SourceConfig::default(),
            explore: ExploreConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// Which dataset to fetch and how far back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Registered dataset id.
    pub dataset: String,
    /// Only crashes newer than this many years before today are fetched.
    pub lookback_years: u32,
    /// Maximum number of rows to fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Socrata application token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_token: Option<String>,
    /// Retry of transient HTTP failures; off by default.
    pub retry: RetryPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            lookback_years: 2,
            limit: None,
            app_token: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Exploratory view settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Crash types need more than this many crashes to be charted.
    pub crash_type_min_total: u64,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            crash_type_min_total: DEFAULT_CRASH_TYPE_MIN_TOTAL,
        }
    }
}

impl PipelineConfig {
    /// Reads the configuration from `path`, or the defaults if `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
