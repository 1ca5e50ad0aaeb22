//! Stratified train/test splitting and v-fold cross-validation.
//!
//! Both functions work on row indices and take their seed explicitly, so a
//! split is reproducible from `(strata, parameters, seed)` alone.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::ModelError;

/// Row indices of a train/test split, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    train: Vec<usize>,
    test: Vec<usize>,
}

impl Split {
    /// Rows used for fitting.
    #[must_use]
    pub fn training(&self) -> &[usize] {
        &self.train
    }

    /// Held-out rows.
    #[must_use]
    pub fn testing(&self) -> &[usize] {
        &self.test
    }
}

/// One cross-validation fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// `Fold01`, `Fold02`, ...
    pub id: String,
    /// Rows the model is fit on.
    pub analysis: Vec<usize>,
    /// Rows the fit is evaluated on.
    pub assessment: Vec<usize>,
}

/// Groups row indices by stratum, strata in sorted order.
fn strata_groups<S: Ord>(strata: &[S]) -> BTreeMap<&S, Vec<usize>> {
    let mut groups: BTreeMap<&S, Vec<usize>> = BTreeMap::new();
    for (row, stratum) in strata.iter().enumerate() {
        groups.entry(stratum).or_default().push(row);
    }
    groups
}

/// Splits rows into training and testing sets, preserving the share of
/// every stratum.
///
/// Within each stratum the rows are shuffled and the first
/// `floor(n * prop)` go to training.
///
/// # Errors
///
/// Returns [`ModelError::InvalidProportion`] unless `0 < prop < 1`, and
/// [`ModelError::EmptyData`] if there are no rows.
pub fn initial_split<S: Ord>(strata: &[S], prop: f64, seed: u64) -> Result<Split, ModelError> {
    if !(prop > 0.0 && prop < 1.0) {
        return Err(ModelError::InvalidProportion { prop });
    }
    if strata.is_empty() {
        return Err(ModelError::EmptyData);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, mut rows) in strata_groups(strata) {
        rows.shuffle(&mut rng);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let take = (rows.len() as f64 * prop).floor() as usize;
        test.extend_from_slice(&rows[take..]);
        rows.truncate(take);
        train.append(&mut rows);
    }

    train.sort_unstable();
    test.sort_unstable();
    log::debug!(
        "Split {} rows into {} training and {} testing",
        strata.len(),
        train.len(),
        test.len()
    );

    Ok(Split { train, test })
}

/// Partitions rows into `v` folds, preserving the share of every stratum.
///
/// Within each stratum the rows are shuffled and dealt to the folds in turn;
/// the dealing continues where the previous stratum stopped so fold sizes
/// differ by at most one.
///
/// # Errors
///
/// Returns [`ModelError::TooFewFolds`] if `v < 2`, and
/// [`ModelError::TooFewRows`] if there are fewer rows than folds.
pub fn vfold_cv<S: Ord>(strata: &[S], v: usize, seed: u64) -> Result<Vec<Fold>, ModelError> {
    if v < 2 {
        return Err(ModelError::TooFewFolds { folds: v });
    }
    if strata.len() < v {
        return Err(ModelError::TooFewRows {
            rows: strata.len(),
            folds: v,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![0usize; strata.len()];
    let mut dealt = 0usize;

    for (_, mut rows) in strata_groups(strata) {
        rows.shuffle(&mut rng);
        for row in rows {
            assignment[row] = dealt % v;
            dealt += 1;
        }
    }

    let folds = (0..v)
        .map(|fold| {
            let (assessment, analysis): (Vec<usize>, Vec<usize>) =
                (0..strata.len()).partition(|&row| assignment[row] == fold);
            Fold {
                id: format!("Fold{:02}", fold + 1),
                analysis,
                assessment,
            }
        })
        .collect();

    Ok(folds)
}

#[cfg(test)]
mod tests {
    use crash_injury_crash_models::Outcome;

    use super::*;

    fn labels(injuries: usize, none: usize) -> Vec<Outcome> {
        let mut v = vec![Outcome::Injuries; injuries];
        v.extend(vec![Outcome::None; none]);
        v
    }

    fn count(rows: &[usize], strata: &[Outcome], outcome: Outcome) -> usize {
        rows.iter().filter(|&&r| strata[r] == outcome).count()
    }

    #[test]
    fn hundred_rows_split_by_stratum() {
        let strata = labels(10, 90);
        let split = initial_split(&strata, 0.75, 2020).unwrap();

        assert_eq!(split.training().len() + split.testing().len(), 100);
        assert_eq!(count(split.training(), &strata, Outcome::Injuries), 7);
        assert_eq!(count(split.training(), &strata, Outcome::None), 67);
        assert_eq!(count(split.testing(), &strata, Outcome::Injuries), 3);
        assert_eq!(count(split.testing(), &strata, Outcome::None), 23);
    }

    #[test]
    fn split_is_disjoint_and_reproducible() {
        let strata = labels(37, 211);
        let a = initial_split(&strata, 0.75, 7).unwrap();
        let b = initial_split(&strata, 0.75, 7).unwrap();
        assert_eq!(a, b);
        assert!(a.training().iter().all(|r| !a.testing().contains(r)));

        let c = initial_split(&strata, 0.75, 8).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn split_rejects_bad_input() {
        let strata = labels(1, 1);
        assert!(matches!(
            initial_split(&strata, 1.0, 1),
            Err(ModelError::InvalidProportion { .. })
        ));
        assert!(matches!(
            initial_split(&strata, 0.0, 1),
            Err(ModelError::InvalidProportion { .. })
        ));
        assert!(matches!(
            initial_split::<Outcome>(&[], 0.5, 1),
            Err(ModelError::EmptyData)
        ));
    }

    #[test]
    fn folds_partition_every_row_once() {
        let strata = labels(20, 83);
        let folds = vfold_cv(&strata, 10, 123).unwrap();
        assert_eq!(folds.len(), 10);
        assert_eq!(folds[0].id, "Fold01");
        assert_eq!(folds[9].id, "Fold10");

        let mut seen = vec![0; strata.len()];
        for fold in &folds {
            assert_eq!(fold.analysis.len() + fold.assessment.len(), strata.len());
            assert!((10..=11).contains(&fold.assessment.len()));
            for &row in &fold.assessment {
                seen[row] += 1;
            }
            assert_eq!(count(&fold.assessment, &strata, Outcome::Injuries), 2);
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn folds_reject_bad_input() {
        let strata = labels(2, 2);
        assert!(matches!(
            vfold_cv(&strata, 1, 1),
            Err(ModelError::TooFewFolds { folds: 1 })
        ));
        assert!(matches!(
            vfold_cv(&strata, 5, 1),
            Err(ModelError::TooFewRows { rows: 4, folds: 5 })
        ));
    }
}
