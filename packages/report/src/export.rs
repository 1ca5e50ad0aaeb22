//! CSV exports of evaluation results.

use std::path::Path;

use crash_injury_model_models::{
    ConfusionCell, MetricEstimate, MetricSummary, Prediction, RocPoint, VariableImportance,
};
use serde::Serialize;

use crate::ReportError;

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Writes resampled metric summaries.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_metric_summaries(path: &Path, summaries: &[MetricSummary]) -> Result<(), ReportError> {
    write_rows(path, summaries)
}

/// Writes single-fit metric estimates (e.g. the test-split metrics).
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_metric_estimates(path: &Path, estimates: &[MetricEstimate]) -> Result<(), ReportError> {
    write_rows(path, estimates)
}

/// Writes predictions, one row each.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> Result<(), ReportError> {
    write_rows(path, predictions)
}

/// Writes the variable importance ranking.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_importance(path: &Path, importance: &[VariableImportance]) -> Result<(), ReportError> {
    write_rows(path, importance)
}

/// Writes the points of a ROC curve.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_roc(path: &Path, curve: &[RocPoint]) -> Result<(), ReportError> {
    write_rows(path, curve)
}

/// Writes the averaged confusion matrix.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_confusion(path: &Path, cells: &[ConfusionCell]) -> Result<(), ReportError> {
    write_rows(path, cells)
}

#[cfg(test)]
mod tests {
    use crash_injury_crash_models::Outcome;
    use crash_injury_model_models::MetricName;

    use super::*;

    fn temp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("crash_injury_{}_{name}", std::process::id()))
    }

    #[test]
    fn predictions_have_a_header_and_one_line_each() {
        let path = temp("predictions.csv");
        let predictions = vec![
            Prediction::from_probability(4, Some("Fold01".to_string()), Outcome::Injuries, 0.75),
            Prediction::from_probability(9, None, Outcome::None, 0.25),
        ];
        write_predictions(&path, &predictions).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "row,fold,truth,pred_injuries,pred_none,predicted"
        );
        assert_eq!(lines[1], "4,Fold01,injuries,0.75,0.25,injuries");
        assert_eq!(lines[2], "9,,none,0.25,0.75,none");
    }

    #[test]
    fn summaries_leave_missing_spread_empty() {
        let path = temp("metrics.csv");
        let summaries = vec![MetricSummary {
            metric: MetricName::RocAuc,
            mean: 0.8,
            std_dev: None,
            std_err: None,
            n: 1,
        }];
        write_metric_summaries(&path, &summaries).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["metric,mean,std_dev,std_err,n", "roc_auc,0.8,,,1"]
        );
    }
}
