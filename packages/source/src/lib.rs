#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic crash dataset registry and Socrata acquisition.
//!
//! Datasets are described by TOML definitions embedded at compile time
//! ([`registry`]). [`socrata::fetch_socrata`] turns a definition plus a
//! lookback window into a filtered, paginated query and materializes the
//! result as in-memory [`RawCrash`] rows.

pub mod dataset_def;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod socrata;

use std::path::Path;

use chrono::{Months, NaiveDate, NaiveDateTime};
use crash_injury_source_models::RawCrash;

/// Errors that can occur while acquiring crash data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A dataset definition could not be parsed.
    #[error("Invalid dataset definition: {0}")]
    Definition(#[from] toml::de::Error),

    /// No dataset with the requested id is registered.
    #[error("Unknown dataset: {id}")]
    UnknownDataset {
        /// The requested dataset id.
        id: String,
    },
}

/// Options for a single acquisition run.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Only fetch records strictly newer than this timestamp.
    pub since: Option<NaiveDateTime>,
    /// Maximum number of records to fetch.
    pub limit: Option<u64>,
    /// Socrata application token, sent as `X-App-Token`.
    pub app_token: Option<String>,
    /// Transport retry behaviour.
    pub retry: retry::RetryPolicy,
}

/// Returns midnight of the day `years` calendar years before `today`.
///
/// Falls back to the earliest representable date if the subtraction
/// underflows.
#[must_use]
pub fn lookback_since(today: NaiveDate, years: u32) -> NaiveDateTime {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN)
}

/// Writes raw rows to `path` as a JSON array.
///
/// # Errors
///
/// Returns [`SourceError`] if serialization or the file write fails.
pub fn save_raw(path: &Path, rows: &[RawCrash]) -> Result<(), SourceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(rows)?;
    std::fs::write(path, json)?;
    log::info!("Wrote {} raw rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads raw rows previously written by [`save_raw`] (or any JSON array of
/// API rows).
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed.
pub fn load_raw(path: &Path) -> Result<Vec<RawCrash>, SourceError> {
    let data = std::fs::read_to_string(path)?;
    let rows: Vec<RawCrash> = serde_json::from_str(&data)?;
    log::info!("Loaded {} raw rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookback_subtracts_calendar_years() {
        let today = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let since = lookback_since(today, 2);
        assert_eq!(since.to_string(), "2020-01-01 00:00:00");
    }

    #[test]
    fn lookback_clamps_leap_day() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let since = lookback_since(today, 1);
        assert_eq!(since.date().to_string(), "2023-02-28");
    }

    #[test]
    fn raw_rows_survive_a_dump() {
        let dir = std::env::temp_dir().join(format!("crash_injury_raw_{}", std::process::id()));
        let path = dir.join("raw.json");
        let rows = vec![RawCrash {
            crash_record_id: Some("a".to_string()),
            injuries_total: Some("1".to_string()),
            ..RawCrash::default()
        }];
        save_raw(&path, &rows).unwrap();
        assert_eq!(load_raw(&path).unwrap(), rows);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
