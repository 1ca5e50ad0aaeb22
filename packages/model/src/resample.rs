//! Cross-validated fitting and the final train/test fit.

use std::sync::Arc;

use crash_injury_model_models::{ConfusionCell, MetricEstimate, MetricSummary, Prediction};
use crash_injury_source::progress::ProgressCallback;
use rayon::prelude::*;

use crate::ModelError;
use crate::frame::Frame;
use crate::metrics::{compute_metrics, conf_mat_resampled, summarize};
use crate::split::{Fold, Split};
use crate::workflow::{FittedWorkflow, Workflow};

/// Metrics and held-out predictions of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldResult {
    /// Fold id.
    pub id: String,
    /// Metrics on the assessment rows.
    pub metrics: Vec<MetricEstimate>,
    /// Predictions for the assessment rows.
    pub predictions: Vec<Prediction>,
}

/// Results of [`fit_resamples`], in fold order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleResults {
    folds: Vec<FoldResult>,
}

impl ResampleResults {
    /// Per-fold results.
    #[must_use]
    pub fn folds(&self) -> &[FoldResult] {
        &self.folds
    }

    /// Every metric summarized over folds.
    #[must_use]
    pub fn collect_metrics(&self) -> Vec<MetricSummary> {
        summarize(self.folds.iter().flat_map(|f| &f.metrics))
    }

    /// Every held-out prediction, fold by fold.
    #[must_use]
    pub fn collect_predictions(&self) -> Vec<Prediction> {
        self.folds
            .iter()
            .flat_map(|f| f.predictions.iter().cloned())
            .collect()
    }

    /// Confusion-matrix cells averaged over folds.
    #[must_use]
    pub fn conf_mat_resampled(&self) -> Vec<ConfusionCell> {
        let groups: Vec<&[Prediction]> = self
            .folds
            .iter()
            .map(|f| f.predictions.as_slice())
            .collect();
        conf_mat_resampled(&groups)
    }
}

/// Fits `workflow` on every fold's analysis rows and evaluates it on the
/// assessment rows. Folds run in parallel; the first failing fold aborts
/// the whole run.
///
/// # Errors
///
/// Returns the error of any fold that fails to fit or predict.
pub fn fit_resamples(
    workflow: &Workflow,
    frame: &Frame,
    folds: &[Fold],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ResampleResults, ModelError> {
    progress.set_total(folds.len() as u64);
    progress.set_message(format!("Fitting {} folds", folds.len()));

    let results = folds
        .par_iter()
        .map(|fold| -> Result<FoldResult, ModelError> {
            let fitted = workflow.fit(&frame.select(&fold.analysis))?;
            let predictions = fitted.predict(
                &frame.select(&fold.assessment),
                &fold.assessment,
                Some(&fold.id),
            )?;
            let metrics = compute_metrics(&predictions);
            log::info!(
                "{}: fit on {} rows, assessed {} rows",
                fold.id,
                fold.analysis.len(),
                fold.assessment.len()
            );
            progress.inc(1);
            Ok(FoldResult {
                id: fold.id.clone(),
                metrics,
                predictions,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    progress.finish(format!("Fit {} folds", results.len()));
    Ok(ResampleResults { folds: results })
}

/// Workflow fitted on the whole training split and its test-split results.
#[derive(Debug)]
pub struct LastFit {
    /// The fitted workflow.
    pub workflow: FittedWorkflow,
    /// Metrics on the test rows.
    pub metrics: Vec<MetricEstimate>,
    /// Predictions for the test rows.
    pub predictions: Vec<Prediction>,
}

/// Fits `workflow` on the training rows of `split` and evaluates it once on
/// the test rows.
///
/// # Errors
///
/// Returns an error if fitting or prediction fails.
pub fn last_fit(workflow: &Workflow, frame: &Frame, split: &Split) -> Result<LastFit, ModelError> {
    let fitted = workflow.fit(&frame.select(split.training()))?;
    let predictions = fitted.predict(&frame.select(split.testing()), split.testing(), None)?;
    let metrics = compute_metrics(&predictions);
    log::info!(
        "Final fit on {} rows, tested on {} rows",
        split.training().len(),
        split.testing().len()
    );
    Ok(LastFit {
        workflow: fitted,
        metrics,
        predictions,
    })
}
