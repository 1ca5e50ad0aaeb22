//! Bagged ensemble of CART classification trees.
//!
//! Each tree is fit on its own bootstrap sample, drawn with a seed derived
//! from the ensemble seed and the tree's index, so the trees can be fit in
//! parallel and the ensemble is still reproducible.

use crash_injury_crash_models::Outcome;
use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Ensemble hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagParams {
    /// Number of trees.
    pub times: usize,
    /// Minimum number of rows in a leaf.
    pub min_n: usize,
    /// Base seed for the bootstrap samples.
    pub seed: u64,
}

/// A fitted ensemble. Immutable once fitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct BaggedTrees {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl BaggedTrees {
    /// Fits `params.times` trees on bootstrap samples of `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyData`] if `x` has no rows,
    /// [`ModelError::LengthMismatch`] if `y` does not have one label per
    /// row, and [`ModelError::Fit`] if the ensemble is empty or a tree fails
    /// to fit.
    pub fn fit(x: &Array2<f64>, y: &[Outcome], params: BagParams) -> Result<Self, ModelError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ModelError::EmptyData);
        }
        if y.len() != n {
            return Err(ModelError::LengthMismatch {
                column: "outcome".to_string(),
                expected: n,
                actual: y.len(),
            });
        }
        if params.times == 0 {
            return Err(ModelError::Fit {
                message: "an ensemble needs at least one tree".to_string(),
            });
        }

        let targets: Array1<usize> = y.iter().map(|o| o.class_index()).collect();
        #[allow(clippy::cast_precision_loss)]
        let min_weight_leaf = params.min_n as f32;

        let trees = (0..params.times)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let dataset = Dataset::new(
                    x.select(Axis(0), &sample),
                    targets.select(Axis(0), &sample),
                );
                DecisionTree::params()
                    .split_quality(SplitQuality::Gini)
                    .max_depth(None)
                    .min_weight_leaf(min_weight_leaf)
                    .fit(&dataset)
                    .map_err(|e| ModelError::Fit {
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!("Fit {} trees on {n} rows", trees.len());
        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    /// Number of trees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the ensemble has no trees.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Number of features the trees were fit on.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Probability of [`Outcome::Injuries`] for every row: the share of
    /// trees voting for it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FeatureMismatch`] if `x` has a different number
    /// of columns than the training matrix.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Vec<f64>, ModelError> {
        if x.ncols() != self.n_features {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }

        let votes: Vec<Array1<usize>> = self.trees.par_iter().map(|t| t.predict(x)).collect();
        let event = Outcome::Injuries.class_index();
        let mut counts = vec![0usize; x.nrows()];
        for tree_votes in &votes {
            for (count, vote) in counts.iter_mut().zip(tree_votes) {
                if *vote == event {
                    *count += 1;
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let trees = self.trees.len() as f64;
        #[allow(clippy::cast_precision_loss)]
        let probabilities = counts.into_iter().map(|c| c as f64 / trees).collect();
        Ok(probabilities)
    }

    /// Impurity importance of every feature, one vector per tree, each
    /// summing to one. Trees that never split report zeros.
    #[must_use]
    pub fn tree_importances(&self) -> Vec<Vec<f64>> {
        self.trees
            .iter()
            .map(|tree| {
                let raw: Vec<f64> = tree
                    .feature_importance()
                    .into_iter()
                    .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
                    .collect();
                let total: f64 = raw.iter().sum();
                if total > 0.0 {
                    raw.into_iter().map(|v| v / total).collect()
                } else {
                    raw
                }
            })
            .collect()
    }
}
