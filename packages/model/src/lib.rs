#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Injury classifier: stratified resampling, a preprocessing recipe, and a
//! bagged decision-tree ensemble.
//!
//! The flow mirrors how the model is evaluated:
//!
//! 1. [`split::initial_split`] holds out a stratified test set.
//! 2. [`split::vfold_cv`] builds stratified folds over the training rows.
//! 3. [`resample::fit_resamples`] fits a [`workflow::Workflow`] per fold
//!    (in parallel) and collects metrics and predictions.
//! 4. [`resample::last_fit`] fits once on the full training split and
//!    evaluates once on the test split.

pub mod bagging;
pub mod encode;
pub mod frame;
pub mod metrics;
pub mod recipe;
pub mod resample;
pub mod split;
pub mod workflow;

/// Errors that can occur while splitting, preprocessing, fitting or
/// persisting the model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A split proportion outside `(0, 1)`.
    #[error("Split proportion must be between 0 and 1, got {prop}")]
    InvalidProportion {
        /// The proportion given.
        prop: f64,
    },

    /// Cross-validation needs at least two folds.
    #[error("Cross-validation needs at least 2 folds, got {folds}")]
    TooFewFolds {
        /// The fold count given.
        folds: usize,
    },

    /// More folds than rows.
    #[error("Cannot build {folds} folds from {rows} rows")]
    TooFewRows {
        /// Available rows.
        rows: usize,
        /// Requested folds.
        folds: usize,
    },

    /// No rows to work with.
    #[error("No rows to fit on")]
    EmptyData,

    /// A step or the encoder needs a column the frame does not have.
    #[error("Missing column: {column}")]
    MissingColumn {
        /// Column name.
        column: String,
    },

    /// A column has the wrong type for the operation.
    #[error("Column {column} is {actual}, expected {expected}")]
    ColumnType {
        /// Column name.
        column: String,
        /// Expected type.
        expected: &'static str,
        /// Actual type.
        actual: &'static str,
    },

    /// A column (or label vector) has the wrong number of values.
    #[error("Column {column} has {actual} values, expected {expected}")]
    LengthMismatch {
        /// Column name.
        column: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The design matrix does not match the fitted model.
    #[error("Model was fit on {expected} features, got {actual}")]
    FeatureMismatch {
        /// Features at fit time.
        expected: usize,
        /// Features given.
        actual: usize,
    },

    /// Fitting a tree failed.
    #[error("Model fit failed: {message}")]
    Fit {
        /// Error reported by the tree learner.
        message: String,
    },

    /// The fitted workflow could not be serialized.
    #[error("Failed to encode model artifact: {0}")]
    ArtifactEncode(#[from] rmp_serde::encode::Error),

    /// Bytes could not be decoded into a fitted workflow.
    #[error("Failed to decode model artifact: {0}")]
    ArtifactDecode(#[from] rmp_serde::decode::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
