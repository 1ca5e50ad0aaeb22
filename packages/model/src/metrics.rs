//! Classification metrics with `injuries` as the event class.
//!
//! Every metric returns `NaN` when it is undefined for the given predictions
//! (no rows, or no rows of the class it conditions on).

use std::collections::BTreeMap;

use crash_injury_crash_models::Outcome;
use crash_injury_model_models::{
    ConfusionCell, MetricEstimate, MetricName, MetricSummary, Prediction, RocPoint,
};

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

fn count(predictions: &[Prediction], truth: Outcome, predicted: Option<Outcome>) -> usize {
    predictions
        .iter()
        .filter(|p| p.truth == truth && predicted.is_none_or(|c| p.predicted == c))
        .count()
}

/// Share of rows whose predicted class equals the truth.
#[must_use]
pub fn accuracy(predictions: &[Prediction]) -> f64 {
    ratio(
        predictions.iter().filter(|p| p.predicted == p.truth).count(),
        predictions.len(),
    )
}

/// Share of `injuries` rows predicted as `injuries`.
#[must_use]
pub fn sensitivity(predictions: &[Prediction]) -> f64 {
    ratio(
        count(predictions, Outcome::Injuries, Some(Outcome::Injuries)),
        count(predictions, Outcome::Injuries, None),
    )
}

/// Share of `none` rows predicted as `none`.
#[must_use]
pub fn specificity(predictions: &[Prediction]) -> f64 {
    ratio(
        count(predictions, Outcome::None, Some(Outcome::None)),
        count(predictions, Outcome::None, None),
    )
}

/// Area under the ROC curve of `pred_injuries`, computed from ranks (ties
/// get their average rank).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn roc_auc(predictions: &[Prediction]) -> f64 {
    let positives = count(predictions, Outcome::Injuries, None);
    let negatives = predictions.len() - positives;
    if positives == 0 || negatives == 0 {
        return f64::NAN;
    }

    let mut order: Vec<&Prediction> = predictions.iter().collect();
    order.sort_by(|a, b| a.pred_injuries.total_cmp(&b.pred_injuries));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && order[end + 1].pred_injuries == order[start].pred_injuries
        {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        let tied_positives = order[start..=end]
            .iter()
            .filter(|p| p.truth == Outcome::Injuries)
            .count();
        positive_rank_sum += rank * tied_positives as f64;
        start = end + 1;
    }

    let (pos, neg) = (positives as f64, negatives as f64);
    (positive_rank_sum - pos * (pos + 1.0) / 2.0) / (pos * neg)
}

/// All metrics for one set of predictions, in [`MetricName::all`] order.
#[must_use]
pub fn compute_metrics(predictions: &[Prediction]) -> Vec<MetricEstimate> {
    MetricName::all()
        .iter()
        .map(|&metric| MetricEstimate {
            metric,
            estimate: match metric {
                MetricName::Accuracy => accuracy(predictions),
                MetricName::RocAuc => roc_auc(predictions),
                MetricName::Sensitivity => sensitivity(predictions),
                MetricName::Specificity => specificity(predictions),
            },
        })
        .collect()
}

/// Mean, standard deviation and standard error of every metric over
/// resamples. Non-finite estimates are left out.
#[must_use]
pub fn summarize<'a>(estimates: impl IntoIterator<Item = &'a MetricEstimate>) -> Vec<MetricSummary> {
    let mut by_metric: BTreeMap<MetricName, Vec<f64>> = BTreeMap::new();
    for estimate in estimates {
        let values = by_metric.entry(estimate.metric).or_default();
        if estimate.estimate.is_finite() {
            values.push(estimate.estimate);
        }
    }

    by_metric
        .into_iter()
        .map(|(metric, values)| {
            let n = values.len();
            #[allow(clippy::cast_precision_loss)]
            let count = n as f64;
            let mean = if n == 0 {
                f64::NAN
            } else {
                values.iter().sum::<f64>() / count
            };
            let std_dev = (n >= 2).then(|| {
                let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (count - 1.0)).sqrt()
            });
            if n == 0 {
                log::warn!("{metric}: no finite estimates");
            }
            MetricSummary {
                metric,
                mean,
                std_dev,
                std_err: std_dev.map(|sd| sd / count.sqrt()),
                n,
            }
        })
        .collect()
}

/// ROC curve of `pred_injuries`, from `(-inf, 0, 1)` to `(+inf, 1, 0)`.
///
/// A row counts as predicted `injuries` at threshold `t` when
/// `pred_injuries >= t`. Empty when either class is absent.
#[must_use]
pub fn roc_curve(predictions: &[Prediction]) -> Vec<RocPoint> {
    let positives = count(predictions, Outcome::Injuries, None);
    let negatives = predictions.len() - positives;
    if positives == 0 || negatives == 0 {
        log::warn!("ROC curve needs both outcome classes");
        return Vec::new();
    }

    let mut order: Vec<&Prediction> = predictions.iter().collect();
    order.sort_by(|a, b| a.pred_injuries.total_cmp(&b.pred_injuries));

    let mut points = vec![RocPoint {
        threshold: f64::NEG_INFINITY,
        specificity: 0.0,
        sensitivity: 1.0,
    }];
    // Rows strictly below the current threshold.
    let mut below_pos = 0;
    let mut below_neg = 0;
    let mut i = 0;
    while i < order.len() {
        let threshold = order[i].pred_injuries;
        points.push(RocPoint {
            threshold,
            specificity: ratio(below_neg, negatives),
            sensitivity: ratio(positives - below_pos, positives),
        });
        while i < order.len() && order[i].pred_injuries == threshold {
            if order[i].truth == Outcome::Injuries {
                below_pos += 1;
            } else {
                below_neg += 1;
            }
            i += 1;
        }
    }
    points.push(RocPoint {
        threshold: f64::INFINITY,
        specificity: 1.0,
        sensitivity: 0.0,
    });
    points
}

/// Confusion-matrix cells averaged over groups of predictions (one group
/// per fold).
#[must_use]
pub fn conf_mat_resampled(groups: &[&[Prediction]]) -> Vec<ConfusionCell> {
    #[allow(clippy::cast_precision_loss)]
    let folds = groups.len().max(1) as f64;
    let mut cells = Vec::with_capacity(4);
    for &truth in Outcome::all() {
        for &predicted in Outcome::all() {
            let total: usize = groups
                .iter()
                .map(|g| count(g, truth, Some(predicted)))
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let mean_count = total as f64 / folds;
            cells.push(ConfusionCell {
                truth,
                predicted,
                mean_count,
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(rows: &[(Outcome, f64)]) -> Vec<Prediction> {
        rows.iter()
            .enumerate()
            .map(|(i, &(truth, p))| Prediction::from_probability(i, None, truth, p))
            .collect()
    }

    const I: Outcome = Outcome::Injuries;
    const N: Outcome = Outcome::None;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn class_metrics_use_injuries_as_event() {
        // TP=2, FN=1, TN=3, FP=1
        let p = preds(&[
            (I, 0.9),
            (I, 0.7),
            (I, 0.2),
            (N, 0.6),
            (N, 0.1),
            (N, 0.3),
            (N, 0.4),
        ]);
        assert!(close(accuracy(&p), 5.0 / 7.0));
        assert!(close(sensitivity(&p), 2.0 / 3.0));
        assert!(close(specificity(&p), 3.0 / 4.0));
    }

    #[test]
    fn auc_handles_perfect_inverted_and_tied_scores() {
        assert!(close(roc_auc(&preds(&[(I, 0.9), (N, 0.1)])), 1.0));
        assert!(close(roc_auc(&preds(&[(I, 0.1), (N, 0.9)])), 0.0));
        assert!(close(roc_auc(&preds(&[(I, 0.5), (N, 0.5)])), 0.5));
        // 5 of 6 positive/negative pairs ordered correctly.
        let p = preds(&[(I, 0.8), (I, 0.4), (N, 0.5), (N, 0.3), (N, 0.1)]);
        assert!(close(roc_auc(&p), 5.0 / 6.0));
    }

    #[test]
    fn single_class_metrics_are_undefined() {
        let p = preds(&[(N, 0.2), (N, 0.7)]);
        assert!(roc_auc(&p).is_nan());
        assert!(sensitivity(&p).is_nan());
        assert!(close(specificity(&p), 0.5));
        assert!(roc_curve(&p).is_empty());
        assert!(accuracy(&[]).is_nan());
    }

    #[test]
    fn summary_skips_undefined_estimates() {
        let estimates = [
            MetricEstimate {
                metric: MetricName::Accuracy,
                estimate: 0.8,
            },
            MetricEstimate {
                metric: MetricName::Accuracy,
                estimate: 0.6,
            },
            MetricEstimate {
                metric: MetricName::RocAuc,
                estimate: f64::NAN,
            },
            MetricEstimate {
                metric: MetricName::RocAuc,
                estimate: 0.7,
            },
        ];
        let summary = summarize(&estimates);
        assert_eq!(summary.len(), 2);

        let acc = &summary[0];
        assert_eq!(acc.metric, MetricName::Accuracy);
        assert_eq!(acc.n, 2);
        assert!(close(acc.mean, 0.7));
        let sd = 0.02f64.sqrt();
        assert!(close(acc.std_dev.unwrap(), sd));
        assert!(close(acc.std_err.unwrap(), sd / 2f64.sqrt()));

        let auc = &summary[1];
        assert_eq!(auc.n, 1);
        assert!(close(auc.mean, 0.7));
        assert!(auc.std_dev.is_none());
    }

    #[test]
    fn roc_curve_runs_from_all_positive_to_all_negative() {
        let p = preds(&[(I, 0.8), (I, 0.4), (N, 0.5), (N, 0.3)]);
        let curve = roc_curve(&p);
        assert_eq!(curve.len(), 6);
        assert_eq!(curve[0].threshold, f64::NEG_INFINITY);
        assert!(close(curve[0].sensitivity, 1.0) && close(curve[0].specificity, 0.0));

        // t = 0.4: rows >= 0.4 are {0.8 I, 0.5 N, 0.4 I}.
        assert!(close(curve[2].threshold, 0.4));
        assert!(close(curve[2].sensitivity, 1.0));
        assert!(close(curve[2].specificity, 0.5));

        // t = 0.8: only the top row.
        assert!(close(curve[4].sensitivity, 0.5));
        assert!(close(curve[4].specificity, 1.0));

        let last = curve.last().unwrap();
        assert_eq!(last.threshold, f64::INFINITY);
        assert!(close(last.sensitivity, 0.0) && close(last.specificity, 1.0));
    }

    #[test]
    fn confusion_cells_average_over_folds() {
        let a = preds(&[(I, 0.9), (N, 0.8)]);
        let b = preds(&[(I, 0.9), (N, 0.1), (N, 0.2)]);
        let cells = conf_mat_resampled(&[a.as_slice(), b.as_slice()]);
        assert_eq!(cells.len(), 4);
        let cell = |t, p| {
            cells
                .iter()
                .find(|c| c.truth == t && c.predicted == p)
                .unwrap()
                .mean_count
        };
        assert!(close(cell(I, I), 1.0));
        assert!(close(cell(N, I), 0.5));
        assert!(close(cell(N, N), 1.0));
        assert!(close(cell(I, N), 0.0));
    }
}
