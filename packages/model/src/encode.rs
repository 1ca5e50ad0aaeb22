//! Conversion of a baked frame into the numeric design matrix.

use std::collections::BTreeSet;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::frame::{ColumnData, Frame};

/// One column of the design matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feature {
    /// A numeric column, copied as is.
    Numeric {
        /// Source column.
        column: String,
    },
    /// `1.0` where the source column equals `level`, else `0.0`.
    Indicator {
        /// Source column.
        column: String,
        /// Level this indicator marks.
        level: String,
    },
}

impl Feature {
    /// The frame column this feature is computed from.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Numeric { column } | Self::Indicator { column, .. } => column,
        }
    }

    /// Display name, `<column>_<level>` for indicators.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Numeric { column } => column.clone(),
            Self::Indicator { column, level } => format!("{column}_{level}"),
        }
    }
}

/// One-hot encoder fitted on the training levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoder {
    features: Vec<Feature>,
}

impl Encoder {
    /// Learns the feature layout from a baked training frame.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ColumnType`] if a date column is still present.
    pub fn fit(frame: &Frame) -> Result<Self, ModelError> {
        let mut features = Vec::new();
        for column in frame.columns() {
            match &column.data {
                ColumnData::Numeric(_) => features.push(Feature::Numeric {
                    column: column.name.clone(),
                }),
                ColumnData::Nominal(values) => {
                    let levels: BTreeSet<&String> = values.iter().collect();
                    features.extend(levels.into_iter().map(|level| Feature::Indicator {
                        column: column.name.clone(),
                        level: level.clone(),
                    }));
                }
                ColumnData::Date(_) => {
                    return Err(ModelError::ColumnType {
                        column: column.name.clone(),
                        expected: "numeric or nominal",
                        actual: "date",
                    });
                }
            }
        }
        Ok(Self { features })
    }

    /// Features in matrix column order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Encodes `frame`. Levels unseen during fitting encode as all zeros.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] or [`ModelError::ColumnType`]
    /// if `frame` does not have the columns the encoder was fitted on.
    pub fn transform(&self, frame: &Frame) -> Result<Array2<f64>, ModelError> {
        let mut matrix = Array2::<f64>::zeros((frame.len(), self.features.len()));
        for (j, feature) in self.features.iter().enumerate() {
            let data = &frame.require(feature.source())?.data;
            let mut out = matrix.column_mut(j);
            match (feature, data) {
                (Feature::Numeric { .. }, ColumnData::Numeric(values)) => {
                    for (cell, value) in out.iter_mut().zip(values) {
                        *cell = *value;
                    }
                }
                (Feature::Indicator { level, .. }, ColumnData::Nominal(values)) => {
                    for (cell, value) in out.iter_mut().zip(values) {
                        if value == level {
                            *cell = 1.0;
                        }
                    }
                }
                (feature, data) => {
                    return Err(ModelError::ColumnType {
                        column: feature.source().to_string(),
                        expected: match feature {
                            Feature::Numeric { .. } => "numeric",
                            Feature::Indicator { .. } => "nominal",
                        },
                        actual: data.kind(),
                    });
                }
            }
        }
        Ok(matrix)
    }
}
