#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration, metric, prediction and importance types for the injury
//! model.

use crash_injury_crash_models::{Outcome, columns};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Settings for splitting, preprocessing and fitting.
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Fraction of rows (per outcome stratum) used for training.
    pub train_prop: f64,
    /// Seed for the train/test split.
    pub split_seed: u64,
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Seed for fold assignment.
    pub fold_seed: u64,
    /// Nominal columns whose rare levels are pooled.
    pub other_columns: Vec<String>,
    /// Frequency (fraction of training rows) below which a level is pooled.
    pub other_threshold: f64,
    /// Label of the pooled level.
    pub other_label: String,
    /// Seed for majority-class downsampling.
    pub downsample_seed: u64,
    /// Number of bagged trees.
    pub trees: usize,
    /// Minimum number of rows in a leaf.
    pub min_n: usize,
    /// Seed for bootstrap resampling of the trees.
    pub bagging_seed: u64,
    /// How many variables to report in the importance ranking.
    pub top_n_importance: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            train_prop: 0.75,
            split_seed: 2020,
            folds: 10,
            fold_seed: 123,
            other_columns: [
                columns::WEATHER_CONDITION,
                columns::FIRST_CRASH_TYPE,
                columns::TRAFFICWAY_TYPE,
                columns::PRIM_CONTRIBUTORY_CAUSE,
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            other_threshold: 0.05,
            other_label: "OTHER".to_string(),
            downsample_seed: 2021,
            trees: 25,
            min_n: 10,
            bagging_seed: 2022,
            top_n_importance: 10,
        }
    }
}

/// Performance metrics collected for every fold and the holdout fit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricName {
    /// Share of correctly classified rows.
    Accuracy,
    /// Area under the ROC curve for the `injuries` event.
    RocAuc,
    /// True-positive rate for `injuries`.
    Sensitivity,
    /// True-negative rate for `injuries`.
    Specificity,
}

impl MetricName {
    /// Returns all metrics in report order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Accuracy,
            Self::RocAuc,
            Self::Sensitivity,
            Self::Specificity,
        ]
    }
}

/// One metric value for one fit. `NaN` when undefined for the data (e.g.
/// AUC on a single-class assessment set).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricEstimate {
    /// Metric name.
    pub metric: MetricName,
    /// Value.
    pub estimate: f64,
}

/// A metric aggregated over resamples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Metric name.
    pub metric: MetricName,
    /// Mean of the finite per-fold values.
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std_dev: Option<f64>,
    /// Standard error of the mean; `None` with fewer than two values.
    pub std_err: Option<f64>,
    /// Number of folds contributing a finite value.
    pub n: usize,
}

/// A class-probability prediction for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Row index within the data set the fit was resampled from.
    pub row: usize,
    /// Fold the row was held out in; `None` for the holdout test split.
    pub fold: Option<String>,
    /// Observed outcome.
    pub truth: Outcome,
    /// Probability of `injuries`.
    pub pred_injuries: f64,
    /// Probability of `none`.
    pub pred_none: f64,
    /// Most probable class (ties go to `injuries`).
    pub predicted: Outcome,
}

impl Prediction {
    /// Builds a prediction from the event probability.
    #[must_use]
    pub fn from_probability(
        row: usize,
        fold: Option<String>,
        truth: Outcome,
        pred_injuries: f64,
    ) -> Self {
        let predicted = if pred_injuries >= 0.5 {
            Outcome::Injuries
        } else {
            Outcome::None
        };
        Self {
            row,
            fold,
            truth,
            pred_injuries,
            pred_none: 1.0 - pred_injuries,
            predicted,
        }
    }
}

/// One point of a receiver operating characteristic curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Rows with `pred_injuries >= threshold` are classified as `injuries`.
    pub threshold: f64,
    /// True-negative rate at this threshold.
    pub specificity: f64,
    /// True-positive rate at this threshold.
    pub sensitivity: f64,
}

/// Importance of one predictor column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableImportance {
    /// Predictor column (after preprocessing, before one-hot encoding).
    pub term: String,
    /// Mean importance over the ensemble's trees.
    pub value: f64,
    /// Standard error of the mean over trees.
    pub std_err: f64,
}

/// Mean count of one confusion-matrix cell over resamples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionCell {
    /// Observed class.
    pub truth: Outcome,
    /// Predicted class.
    pub predicted: Outcome,
    /// Mean number of rows per fold.
    pub mean_count: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ModelConfig = toml::from_str("").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.trees, 25);
        assert_eq!(config.min_n, 10);
        assert_eq!(config.folds, 10);
        assert_eq!(config.other_columns.len(), 4);
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config: ModelConfig = toml::from_str("folds = 5\ntrees = 11").unwrap();
        assert_eq!(config.folds, 5);
        assert_eq!(config.trees, 11);
        assert_eq!(config.split_seed, 2020);
    }

    #[test]
    fn metric_names_are_snake_case() {
        assert_eq!(MetricName::RocAuc.to_string(), "roc_auc");
        assert_eq!(MetricName::all().len(), 4);
    }

    #[test]
    fn predicted_class_follows_probability() {
        let p = Prediction::from_probability(3, None, Outcome::None, 0.72);
        assert_eq!(p.predicted, Outcome::Injuries);
        assert!((p.pred_none - 0.28).abs() < 1e-12);
        let tie = Prediction::from_probability(0, None, Outcome::None, 0.5);
        assert_eq!(tie.predicted, Outcome::Injuries);
        let low = Prediction::from_probability(0, None, Outcome::None, 0.2);
        assert_eq!(low.predicted, Outcome::None);
    }
}
