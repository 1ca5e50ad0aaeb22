#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rendering of exploration and evaluation results.
//!
//! [`charts`] builds `plotly` figures and writes them as standalone HTML;
//! [`export`] writes metrics, predictions, importances and ROC points as
//! CSV.

pub mod charts;
pub mod export;

/// Errors that can occur while writing reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
