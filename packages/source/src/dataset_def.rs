//! Config-driven crash dataset definition.
//!
//! A [`DatasetDefinition`] captures everything needed to query one open-data
//! table: where it lives, which column carries the crash timestamp, and how
//! large each page is.

use serde::Deserialize;

use crate::SourceError;

/// A complete, config-driven dataset definition.
///
/// Loaded from TOML files at compile time.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"chicago_traffic_crashes"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable portal page for the dataset.
    #[serde(default)]
    pub portal_url: Option<String>,
    /// How to query the API.
    pub fetcher: FetcherConfig,
}

/// How to fetch raw rows from the dataset API.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetcherConfig {
    /// Socrata SODA API (`$limit/$offset/$order/$where`).
    Socrata {
        /// Resource URL (`https://<domain>/resource/<id>.json`).
        api_url: String,
        /// Timestamp column used for ordering and the lookback filter.
        date_column: String,
        /// Records per page.
        page_size: u64,
    },
}

impl DatasetDefinition {
    /// Returns the unique dataset identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the portal page of the dataset, if one is configured.
    #[must_use]
    pub fn portal_url(&self) -> Option<&str> {
        self.portal_url.as_deref()
    }

    /// Returns the API endpoint this dataset is fetched from.
    #[must_use]
    pub fn api_url(&self) -> &str {
        match &self.fetcher {
            FetcherConfig::Socrata { api_url, .. } => api_url,
        }
    }
}

/// Parses a dataset definition from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Definition`] if the TOML is malformed or misses a
/// required field.
pub fn parse_dataset_toml(toml_str: &str) -> Result<DatasetDefinition, SourceError> {
    Ok(toml::from_str(toml_str)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        id = "test_crashes"
        name = "Test crashes"

        [fetcher]
        type = "socrata"
        api_url = "https://example.org/resource/abcd-1234.json"
        date_column = "crash_date"
        page_size = 1000
    "#;

    #[test]
    fn parses_socrata_definition() {
        let def = parse_dataset_toml(MINIMAL).unwrap();
        assert_eq!(def.id(), "test_crashes");
        assert_eq!(def.api_url(), "https://example.org/resource/abcd-1234.json");
        assert!(def.portal_url().is_none());
        let FetcherConfig::Socrata { page_size, .. } = def.fetcher;
        assert_eq!(page_size, 1000);
    }

    #[test]
    fn rejects_unknown_fetcher() {
        let toml = MINIMAL.replace("type = \"socrata\"", "type = \"arcgis\"");
        assert!(matches!(
            parse_dataset_toml(&toml),
            Err(SourceError::Definition(_))
        ));
    }
}
