//! A recipe bundled with the ensemble, and its fitted, serializable form.

use std::collections::BTreeMap;
use std::path::Path;

use crash_injury_model_models::{ModelConfig, Prediction, VariableImportance};
use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::bagging::{BagParams, BaggedTrees};
use crate::encode::Encoder;
use crate::frame::Frame;
use crate::recipe::{Recipe, Stage, TrainedRecipe};

/// Preprocessing plus model specification, not yet fitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    recipe: Recipe,
    params: BagParams,
}

impl Workflow {
    /// Bundles a recipe with ensemble parameters.
    #[must_use]
    pub const fn new(recipe: Recipe, params: BagParams) -> Self {
        Self { recipe, params }
    }

    /// The crash recipe and a bagged-tree ensemble sized by `config`.
    #[must_use]
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            Recipe::crash_default(config),
            BagParams {
                times: config.trees,
                min_n: config.min_n,
                seed: config.bagging_seed,
            },
        )
    }

    /// Preps the recipe on `training`, fits the encoder on the processed
    /// rows, then fits the ensemble.
    ///
    /// # Errors
    ///
    /// Propagates any recipe, encoding or fitting error.
    pub fn fit(&self, training: &Frame) -> Result<FittedWorkflow, ModelError> {
        let (recipe, processed) = self.recipe.prep(training.clone())?;
        let encoder = Encoder::fit(&processed)?;
        let x = encoder.transform(&processed)?;
        let model = BaggedTrees::fit(&x, processed.outcomes(), self.params)?;
        Ok(FittedWorkflow {
            recipe,
            encoder,
            model,
        })
    }
}

/// Trained recipe, encoder and ensemble. Never modified after fitting.
#[derive(Debug, Serialize, Deserialize)]
pub struct FittedWorkflow {
    recipe: TrainedRecipe,
    encoder: Encoder,
    model: BaggedTrees,
}

impl FittedWorkflow {
    /// The fitted ensemble.
    #[must_use]
    pub const fn model(&self) -> &BaggedTrees {
        &self.model
    }

    /// Probability of `injuries` for every row of `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame` lacks a column the recipe or encoder
    /// needs.
    pub fn predict_proba(&self, frame: &Frame) -> Result<Vec<f64>, ModelError> {
        let baked = self.recipe.bake(frame.clone(), Stage::New)?;
        let x = self.encoder.transform(&baked)?;
        self.model.predict_proba(&x)
    }

    /// Predictions for every row of `frame`. `rows[i]` is reported as the
    /// row index of the `i`th row.
    ///
    /// # Errors
    ///
    /// Returns an error if prediction fails or `rows` does not have one
    /// index per row.
    pub fn predict(
        &self,
        frame: &Frame,
        rows: &[usize],
        fold: Option<&str>,
    ) -> Result<Vec<Prediction>, ModelError> {
        if rows.len() != frame.len() {
            return Err(ModelError::LengthMismatch {
                column: "row".to_string(),
                expected: frame.len(),
                actual: rows.len(),
            });
        }
        let probabilities = self.predict_proba(frame)?;
        Ok(rows
            .iter()
            .zip(frame.outcomes())
            .zip(probabilities)
            .map(|((&row, &truth), p)| {
                Prediction::from_probability(row, fold.map(ToString::to_string), truth, p)
            })
            .collect())
    }

    /// Importance per predictor column (indicators summed back into their
    /// column), averaged over trees, top `top_n` highest first.
    #[must_use]
    pub fn variable_importance(&self, top_n: usize) -> Vec<VariableImportance> {
        let per_tree = self.model.tree_importances();
        let features = self.encoder.features();

        let mut by_term: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for feature in features {
            by_term
                .entry(feature.source())
                .or_insert_with(|| vec![0.0; per_tree.len()]);
        }
        for (t, importances) in per_tree.iter().enumerate() {
            for (feature, value) in features.iter().zip(importances) {
                if let Some(values) = by_term.get_mut(feature.source()) {
                    values[t] += value;
                }
            }
        }

        let mut ranked: Vec<VariableImportance> = by_term
            .into_iter()
            .map(|(term, values)| {
                #[allow(clippy::cast_precision_loss)]
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let std_err = if values.len() < 2 {
                    0.0
                } else {
                    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                    (ss / (n - 1.0)).sqrt() / n.sqrt()
                };
                VariableImportance {
                    term: term.to_string(),
                    value: mean,
                    std_err,
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.term.cmp(&b.term)));
        ranked.truncate(top_n);
        ranked
    }

    /// Encodes the workflow as `MessagePack`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ArtifactEncode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decodes a workflow written by [`Self::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ArtifactDecode`] if the bytes are not a valid
    /// artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Writes the artifact to `path`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = self.to_bytes()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &bytes)?;
        log::info!("Saved model ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Reads an artifact from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use crash_injury_crash_models::{Outcome, columns};

    use super::*;
    use crate::frame::tests::record;

    /// Injury crashes are pedestrian crashes in the rain, the rest rear
    /// ends in clear weather.
    fn frame() -> Frame {
        let records: Vec<_> = (0..120)
            .map(|i| {
                if i % 4 == 0 {
                    record(i, Outcome::Injuries, "RAIN")
                } else {
                    record(i, Outcome::None, "CLEAR")
                }
            })
            .collect();
        Frame::from_records(&records)
    }

    fn config() -> ModelConfig {
        ModelConfig {
            trees: 9,
            min_n: 2,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn fitted_workflow_separates_the_classes() {
        let fitted = Workflow::from_config(&config()).fit(&frame()).unwrap();
        assert_eq!(fitted.model().len(), 9);

        let sample = Frame::from_records(&[
            record(1, Outcome::Injuries, "RAIN"),
            record(2, Outcome::None, "CLEAR"),
        ]);
        let predictions = fitted.predict(&sample, &[10, 11], Some("Fold01")).unwrap();
        assert_eq!(predictions[0].row, 10);
        assert_eq!(predictions[0].fold.as_deref(), Some("Fold01"));
        assert_eq!(predictions[0].predicted, Outcome::Injuries);
        assert_eq!(predictions[1].predicted, Outcome::None);
    }

    #[test]
    fn importance_is_reported_per_source_column() {
        let fitted = Workflow::from_config(&config()).fit(&frame()).unwrap();
        let importance = fitted.variable_importance(3);
        assert_eq!(importance.len(), 3);
        assert!(importance.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(
            importance
                .iter()
                .all(|v| !v.term.contains("_RAIN") && !v.term.contains("_CLEAR"))
        );
        let top = importance[0].term.as_str();
        assert!(
            top == columns::WEATHER_CONDITION || top == columns::FIRST_CRASH_TYPE,
            "{top}"
        );

        let all = fitted.variable_importance(usize::MAX);
        let total: f64 = all.iter().map(|v| v.value).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn artifact_round_trips() {
        let fitted = Workflow::from_config(&config()).fit(&frame()).unwrap();
        let restored = FittedWorkflow::from_bytes(&fitted.to_bytes().unwrap()).unwrap();
        assert_eq!(
            fitted.predict_proba(&frame()).unwrap(),
            restored.predict_proba(&frame()).unwrap()
        );
        assert!(matches!(
            FittedWorkflow::from_bytes(b"not a model"),
            Err(ModelError::ArtifactDecode(_))
        ));
    }

    #[test]
    fn save_creates_missing_directories() {
        let fitted = Workflow::from_config(&config()).fit(&frame()).unwrap();
        let dir = std::env::temp_dir().join(format!("crash_injury_model_{}", std::process::id()));
        let path = dir.join("nested").join("model.msgpack");

        fitted.save(&path).unwrap();
        let restored = FittedWorkflow::load(&path).unwrap();
        assert_eq!(
            fitted.predict_proba(&frame()).unwrap(),
            restored.predict_proba(&frame()).unwrap()
        );
        std::fs::remove_dir_all(dir).unwrap();
    }
}
