//! Ordered preprocessing steps with a prep-on-training, bake-on-anything
//! contract.
//!
//! A [`Recipe`] is a list of [`Step`] definitions. [`Recipe::prep`] learns
//! whatever each step needs from the training frame (step by step, each on
//! the output of the previous one) and returns a [`TrainedRecipe`] holding
//! only [`PreparedStep`]s. Baking never refits anything.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use crash_injury_crash_models::{Outcome, columns};
use crash_injury_model_models::ModelConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::frame::{Column, ColumnData, Frame};

const WEEKDAY_LEVELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_LEVELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Feature derived from a timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFeature {
    /// Day of week, nominal `Sun`..`Sat`.
    Dow,
    /// Month, nominal `Jan`..`Dec`.
    Month,
    /// Calendar year, numeric.
    Year,
}

impl DateFeature {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Dow => "dow",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Whether data is being baked for fitting or for prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The training set the recipe was prepped on (or a fold's analysis set).
    Training,
    /// Any data the model predicts on.
    New,
}

/// Definition of one preprocessing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Adds `<column>_<feature>` columns derived from a timestamp.
    Date {
        /// Timestamp column.
        column: String,
        /// Features to derive.
        features: Vec<DateFeature>,
    },
    /// Drops columns.
    Remove {
        /// Columns to drop.
        columns: Vec<String>,
    },
    /// Pools levels rarer than `threshold` into `label`.
    Other {
        /// Nominal columns to pool.
        columns: Vec<String>,
        /// Minimum share of training rows a level needs to be kept.
        threshold: f64,
        /// Name of the pooled level.
        label: String,
    },
    /// Randomly drops rows of the larger outcome classes until every class
    /// has as many rows as the smallest. Applied to training data only.
    Downsample {
        /// Sampling seed.
        seed: u64,
    },
}

/// A step with everything it learned from the training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PreparedStep {
    /// See [`Step::Date`].
    Date {
        /// Timestamp column.
        column: String,
        /// Features to derive.
        features: Vec<DateFeature>,
    },
    /// See [`Step::Remove`].
    Remove {
        /// Columns to drop.
        columns: Vec<String>,
    },
    /// See [`Step::Other`].
    Other {
        /// Levels kept per column; everything else becomes `label`.
        kept: BTreeMap<String, BTreeSet<String>>,
        /// Name of the pooled level.
        label: String,
    },
    /// See [`Step::Downsample`].
    Downsample {
        /// Sampling seed.
        seed: u64,
    },
}

/// An ordered list of preprocessing steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    steps: Vec<Step>,
}

impl Recipe {
    /// Creates an empty recipe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// The crash preprocessing: date features, drop the raw date, pool rare
    /// levels of the configured columns, downsample the majority outcome.
    #[must_use]
    pub fn crash_default(config: &ModelConfig) -> Self {
        Self::new()
            .step(Step::Date {
                column: columns::CRASH_DATE.to_string(),
                features: vec![DateFeature::Dow, DateFeature::Month, DateFeature::Year],
            })
            .step(Step::Remove {
                columns: vec![columns::CRASH_DATE.to_string()],
            })
            .step(Step::Other {
                columns: config.other_columns.clone(),
                threshold: config.other_threshold,
                label: config.other_label.clone(),
            })
            .step(Step::Downsample {
                seed: config.downsample_seed,
            })
    }

    /// Learns every step from `training` and returns the trained recipe
    /// together with the fully processed training data.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyData`] for an empty frame, and
    /// [`ModelError::MissingColumn`] or [`ModelError::ColumnType`] if a step
    /// names a column that is absent or of the wrong type.
    pub fn prep(&self, training: Frame) -> Result<(TrainedRecipe, Frame), ModelError> {
        if training.is_empty() {
            return Err(ModelError::EmptyData);
        }

        let mut frame = training;
        let mut prepared = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let step = prepare(step, &frame)?;
            frame = apply(&step, frame, Stage::Training)?;
            prepared.push(step);
        }

        log::debug!(
            "Prepped {} steps; {} training rows, {} columns",
            prepared.len(),
            frame.len(),
            frame.columns().len()
        );
        Ok((TrainedRecipe { steps: prepared }, frame))
    }
}

/// A recipe whose steps have been learned from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedRecipe {
    steps: Vec<PreparedStep>,
}

impl TrainedRecipe {
    /// Applies every step to `frame`. Steps that only make sense for
    /// training data (downsampling) are skipped at [`Stage::New`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] or [`ModelError::ColumnType`]
    /// if `frame` lacks a column a step needs.
    pub fn bake(&self, frame: Frame, stage: Stage) -> Result<Frame, ModelError> {
        self.steps
            .iter()
            .try_fold(frame, |frame, step| apply(step, frame, stage))
    }
}

fn prepare(step: &Step, frame: &Frame) -> Result<PreparedStep, ModelError> {
    Ok(match step {
        Step::Date { column, features } => PreparedStep::Date {
            column: column.clone(),
            features: features.clone(),
        },
        Step::Remove { columns } => PreparedStep::Remove {
            columns: columns.clone(),
        },
        Step::Other {
            columns,
            threshold,
            label,
        } => {
            let mut kept = BTreeMap::new();
            for name in columns {
                let levels = nominal(frame, name)?;
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for level in levels {
                    *counts.entry(level.as_str()).or_default() += 1;
                }
                #[allow(clippy::cast_precision_loss)]
                let total = levels.len() as f64;
                #[allow(clippy::cast_precision_loss)]
                let keep: BTreeSet<String> = counts
                    .into_iter()
                    .filter(|&(_, n)| n as f64 / total >= *threshold)
                    .map(|(level, _)| level.to_string())
                    .collect();
                log::debug!("{name}: keeping {} levels", keep.len());
                kept.insert(name.clone(), keep);
            }
            PreparedStep::Other {
                kept,
                label: label.clone(),
            }
        }
        Step::Downsample { seed } => PreparedStep::Downsample { seed: *seed },
    })
}

fn apply(step: &PreparedStep, mut frame: Frame, stage: Stage) -> Result<Frame, ModelError> {
    match step {
        PreparedStep::Date { column, features } => {
            let dates = match &frame.require(column)?.data {
                ColumnData::Date(dates) => dates.clone(),
                other => {
                    return Err(ModelError::ColumnType {
                        column: column.clone(),
                        expected: "date",
                        actual: other.kind(),
                    });
                }
            };
            for feature in features {
                let data = match feature {
                    DateFeature::Dow => ColumnData::Nominal(
                        dates
                            .iter()
                            .map(|d| {
                                WEEKDAY_LEVELS[d.weekday().num_days_from_sunday() as usize]
                                    .to_string()
                            })
                            .collect(),
                    ),
                    DateFeature::Month => ColumnData::Nominal(
                        dates
                            .iter()
                            .map(|d| MONTH_LEVELS[d.month0() as usize].to_string())
                            .collect(),
                    ),
                    DateFeature::Year => {
                        ColumnData::Numeric(dates.iter().map(|d| f64::from(d.year())).collect())
                    }
                };
                frame.push(Column::new(format!("{column}_{}", feature.suffix()), data))?;
            }
        }
        PreparedStep::Remove { columns } => {
            for column in columns {
                frame.remove(column)?;
            }
        }
        PreparedStep::Other { kept, label } => {
            for (column, levels) in kept {
                let pooled = nominal(&frame, column)?
                    .iter()
                    .map(|level| {
                        if levels.contains(level) {
                            level.clone()
                        } else {
                            label.clone()
                        }
                    })
                    .collect();
                frame.replace(column, ColumnData::Nominal(pooled))?;
            }
        }
        PreparedStep::Downsample { seed } => {
            if stage == Stage::Training {
                frame = downsample(&frame, *seed);
            }
        }
    }
    Ok(frame)
}

fn nominal<'a>(frame: &'a Frame, name: &str) -> Result<&'a [String], ModelError> {
    match &frame.require(name)?.data {
        ColumnData::Nominal(levels) => Ok(levels),
        other => Err(ModelError::ColumnType {
            column: name.to_string(),
            expected: "nominal",
            actual: other.kind(),
        }),
    }
}

/// Keeps a random `min(class counts)` rows of every outcome, original row
/// order preserved. A frame missing one outcome entirely is returned as is.
fn downsample(frame: &Frame, seed: u64) -> Frame {
    let mut by_class: BTreeMap<Outcome, Vec<usize>> = BTreeMap::new();
    for (row, outcome) in frame.outcomes().iter().enumerate() {
        by_class.entry(*outcome).or_default().push(row);
    }
    if by_class.len() < Outcome::all().len() {
        log::warn!("Training data holds a single outcome class; not downsampling");
        return frame.clone();
    }
    let target = by_class.values().map(Vec::len).min().unwrap_or(0);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep: Vec<usize> = by_class
        .values()
        .flat_map(|rows| {
            rand::seq::index::sample(&mut rng, rows.len(), target)
                .into_iter()
                .map(|i| rows[i])
                .collect::<Vec<_>>()
        })
        .collect();
    keep.sort_unstable();

    log::debug!(
        "Downsampled {} rows to {} ({target} per class)",
        frame.len(),
        keep.len()
    );
    frame.select(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tests::record;

    fn weather_frame() -> Frame {
        let mut records = Vec::new();
        for i in 0..100 {
            let weather = match i {
                0..=59 => "CLEAR",
                60..=89 => "RAIN",
                90..=95 => "SNOW",
                _ => "FOG",
            };
            let outcome = if i % 5 == 0 {
                Outcome::Injuries
            } else {
                Outcome::None
            };
            records.push(record(i, outcome, weather));
        }
        Frame::from_records(&records)
    }

    fn weather(frame: &Frame) -> Vec<String> {
        match &frame.require(columns::WEATHER_CONDITION).unwrap().data {
            ColumnData::Nominal(v) => v.clone(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn rare_levels_collapse_into_other() {
        let recipe = Recipe::new().step(Step::Other {
            columns: vec![columns::WEATHER_CONDITION.to_string()],
            threshold: 0.05,
            label: "OTHER".to_string(),
        });
        let (trained, baked) = recipe.prep(weather_frame()).unwrap();
        let levels: BTreeSet<String> = weather(&baked).into_iter().collect();
        let expected: BTreeSet<String> = ["CLEAR", "RAIN", "SNOW", "OTHER"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(levels, expected);
        assert_eq!(weather(&baked).iter().filter(|l| *l == "OTHER").count(), 4);

        let fresh = Frame::from_records(&[
            record(1, Outcome::None, "SLEET"),
            record(2, Outcome::None, "SNOW"),
            record(3, Outcome::None, "FOG"),
        ]);
        let baked = trained.bake(fresh, Stage::New).unwrap();
        assert_eq!(weather(&baked), vec!["OTHER", "SNOW", "OTHER"]);
    }

    #[test]
    fn date_step_adds_features_and_remove_drops_the_raw_date() {
        let recipe = Recipe::crash_default(&ModelConfig::default());
        let (trained, _) = recipe.prep(weather_frame()).unwrap();

        // 2023-03-05 is a Sunday.
        let fresh = Frame::from_records(&[record(4, Outcome::None, "CLEAR")]);
        let baked = trained.bake(fresh, Stage::New).unwrap();
        assert!(baked.column(columns::CRASH_DATE).is_none());
        assert_eq!(
            baked.require("crash_date_dow").unwrap().data,
            ColumnData::Nominal(vec!["Sun".to_string()])
        );
        assert_eq!(
            baked.require("crash_date_month").unwrap().data,
            ColumnData::Nominal(vec!["Mar".to_string()])
        );
        assert_eq!(
            baked.require("crash_date_year").unwrap().data,
            ColumnData::Numeric(vec![2023.0])
        );
    }

    #[test]
    fn downsampling_balances_training_data_only() {
        let recipe = Recipe::new().step(Step::Downsample { seed: 2021 });
        let (trained, juiced) = recipe.prep(weather_frame()).unwrap();
        let injuries = juiced
            .outcomes()
            .iter()
            .filter(|o| **o == Outcome::Injuries)
            .count();
        assert_eq!(juiced.len(), 40);
        assert_eq!(injuries, 20);

        let again = trained.bake(weather_frame(), Stage::Training).unwrap();
        assert_eq!(again, juiced);

        let new = trained.bake(weather_frame(), Stage::New).unwrap();
        assert_eq!(new.len(), 100);
    }

    #[test]
    fn steps_report_missing_and_mistyped_columns() {
        let recipe = Recipe::new().step(Step::Remove {
            columns: vec!["nope".to_string()],
        });
        assert!(matches!(
            recipe.prep(weather_frame()),
            Err(ModelError::MissingColumn { .. })
        ));

        let recipe = Recipe::new().step(Step::Date {
            column: columns::WEATHER_CONDITION.to_string(),
            features: vec![DateFeature::Year],
        });
        assert!(matches!(
            recipe.prep(weather_frame()),
            Err(ModelError::ColumnType { .. })
        ));
    }
}
