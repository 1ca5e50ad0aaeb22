//! Dataset registry: every dataset definition, parsed from embedded TOML.
//!
//! Each `.toml` file in `packages/source/datasets/` is baked into the binary
//! at compile time via [`include_str!`].

use crate::SourceError;
use crate::dataset_def::{DatasetDefinition, parse_dataset_toml};

/// Dataset used when none is requested explicitly.
pub const DEFAULT_DATASET: &str = "chicago_traffic_crashes";

/// TOML configs embedded at compile time.
const DATASET_TOMLS: &[(&str, &str)] = &[(
    "chicago_traffic_crashes",
    include_str!("../datasets/chicago_traffic_crashes.toml"),
)];

/// Returns all configured dataset definitions, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (the configs are embedded, so this
/// surfaces in the registry tests rather than at runtime).
#[must_use]
pub fn all_datasets() -> Vec<DatasetDefinition> {
    DATASET_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_dataset_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up a dataset definition by id.
///
/// # Errors
///
/// Returns [`SourceError::UnknownDataset`] if no definition has that id.
pub fn find_dataset(id: &str) -> Result<DatasetDefinition, SourceError> {
    all_datasets()
        .into_iter()
        .find(|d| d.id == id)
        .ok_or_else(|| SourceError::UnknownDataset { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_datasets() {
        assert_eq!(all_datasets().len(), DATASET_TOMLS.len());
    }

    #[test]
    fn registry_names_match_ids() {
        for ((name, _), def) in DATASET_TOMLS.iter().zip(all_datasets()) {
            assert_eq!(*name, def.id);
        }
    }

    #[test]
    fn default_dataset_is_registered() {
        let def = find_dataset(DEFAULT_DATASET).unwrap();
        assert!(def.api_url().contains("85ca-t3if"));
        assert!(def.portal_url().is_some_and(|u| u.contains("85ca-t3if")));
    }

    #[test]
    fn unknown_dataset_is_an_error() {
        assert!(matches!(
            find_dataset("nope"),
            Err(SourceError::UnknownDataset { .. })
        ));
    }
}
