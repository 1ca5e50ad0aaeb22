//! Column-oriented table of predictors plus the outcome label.

use chrono::NaiveDateTime;
use crash_injury_crash_models::{CrashRecord, Outcome, columns};

use crate::ModelError;

/// Values of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Numeric predictor.
    Numeric(Vec<f64>),
    /// Nominal predictor; every distinct string is a level.
    Nominal(Vec<String>),
    /// Timestamp; must be expanded into features before encoding.
    Date(Vec<NaiveDateTime>),
}

impl ColumnData {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Nominal(v) => v.len(),
            Self::Date(v) => v.len(),
        }
    }

    /// Whether the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the column type, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Nominal(_) => "nominal",
            Self::Date(_) => "date",
        }
    }

    fn select(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(rows.iter().map(|&i| v[i]).collect()),
            Self::Nominal(v) => Self::Nominal(rows.iter().map(|&i| v[i].clone()).collect()),
            Self::Date(v) => Self::Date(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Values, one per row.
    pub data: ColumnData,
}

impl Column {
    /// Creates a column.
    #[must_use]
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Predictor columns of equal length and the matching outcome labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    outcomes: Vec<Outcome>,
}

impl Frame {
    /// Builds a frame, checking that every column has one value per outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if a column's length differs
    /// from the number of outcomes.
    pub fn new(columns: Vec<Column>, outcomes: Vec<Outcome>) -> Result<Self, ModelError> {
        for column in &columns {
            if column.data.len() != outcomes.len() {
                return Err(ModelError::LengthMismatch {
                    column: column.name.clone(),
                    expected: outcomes.len(),
                    actual: column.data.len(),
                });
            }
        }
        Ok(Self { columns, outcomes })
    }

    /// Converts cleaned records. Every retained column except the label
    /// becomes a predictor.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CrashRecord>) -> Self {
        let records: Vec<&CrashRecord> = records.into_iter().collect();
        let numeric = |f: fn(&CrashRecord) -> f64| {
            ColumnData::Numeric(records.iter().map(|r| f(r)).collect())
        };
        let nominal = |f: fn(&CrashRecord) -> &str| {
            ColumnData::Nominal(records.iter().map(|r| f(r).to_string()).collect())
        };

        let columns = vec![
            Column::new(
                columns::CRASH_DATE,
                ColumnData::Date(records.iter().map(|r| r.crash_date).collect()),
            ),
            Column::new(columns::CRASH_HOUR, numeric(|r| f64::from(r.crash_hour))),
            Column::new(columns::REPORT_TYPE, nominal(|r| r.report_type.as_str())),
            Column::new(columns::NUM_UNITS, numeric(|r| f64::from(r.num_units))),
            Column::new(
                columns::POSTED_SPEED_LIMIT,
                numeric(|r| f64::from(r.posted_speed_limit)),
            ),
            Column::new(columns::WEATHER_CONDITION, nominal(|r| r.weather_condition.as_str())),
            Column::new(columns::LIGHTING_CONDITION, nominal(|r| r.lighting_condition.as_str())),
            Column::new(
                columns::ROADWAY_SURFACE_COND,
                nominal(|r| r.roadway_surface_cond.as_str()),
            ),
            Column::new(columns::FIRST_CRASH_TYPE, nominal(|r| r.first_crash_type.as_str())),
            Column::new(columns::TRAFFICWAY_TYPE, nominal(|r| r.trafficway_type.as_str())),
            Column::new(
                columns::PRIM_CONTRIBUTORY_CAUSE,
                nominal(|r| r.prim_contributory_cause.as_str()),
            ),
            Column::new(columns::LATITUDE, numeric(|r| r.latitude)),
            Column::new(columns::LONGITUDE, numeric(|r| r.longitude)),
        ];
        let outcomes = records.iter().map(|r| r.injuries).collect();

        Self { columns, outcomes }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome label of every row.
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Predictor columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name, failing if it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] if no column has that name.
    pub fn require(&self, name: &str) -> Result<&Column, ModelError> {
        self.column(name).ok_or_else(|| ModelError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Replaces the values of an existing column.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] if the column is absent, or
    /// [`ModelError::LengthMismatch`] if `data` has the wrong length.
    pub fn replace(&mut self, name: &str, data: ColumnData) -> Result<(), ModelError> {
        let expected = self.len();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ModelError::MissingColumn {
                column: name.to_string(),
            })?;
        if data.len() != expected {
            return Err(ModelError::LengthMismatch {
                column: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        column.data = data;
        Ok(())
    }

    /// Appends a column, replacing any column with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if the column has the wrong
    /// length.
    pub fn push(&mut self, column: Column) -> Result<(), ModelError> {
        if column.data.len() != self.len() {
            return Err(ModelError::LengthMismatch {
                column: column.name,
                expected: self.len(),
                actual: column.data.len(),
            });
        }
        self.columns.retain(|c| c.name != column.name);
        self.columns.push(column);
        Ok(())
    }

    /// Removes a column by name and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingColumn`] if the column is absent.
    pub fn remove(&mut self, name: &str) -> Result<Column, ModelError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ModelError::MissingColumn {
                column: name.to_string(),
            })?;
        Ok(self.columns.remove(position))
    }

    /// Returns a new frame holding the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn select(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.select(rows)))
                .collect(),
            outcomes: rows.iter().map(|&i| self.outcomes[i]).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn record(day: u32, outcome: Outcome, weather: &str) -> CrashRecord {
        CrashRecord {
            injuries: outcome,
            crash_date: NaiveDateTime::parse_from_str(
                &format!("2023-03-{:02} 08:30", 1 + day % 28),
                "%Y-%m-%d %H:%M",
            )
            .unwrap(),
            crash_hour: u8::try_from(day % 24).unwrap(),
            report_type: "ON SCENE".to_string(),
            num_units: 2 + day % 2,
            posted_speed_limit: 30,
            weather_condition: weather.to_string(),
            lighting_condition: "DAYLIGHT".to_string(),
            roadway_surface_cond: "DRY".to_string(),
            first_crash_type: if outcome == Outcome::Injuries {
                "PEDESTRIAN".to_string()
            } else {
                "REAR END".to_string()
            },
            trafficway_type: "NOT DIVIDED".to_string(),
            prim_contributory_cause: "UNABLE TO DETERMINE".to_string(),
            latitude: 41.9,
            longitude: -87.6,
        }
    }

    #[test]
    fn records_become_all_predictors_but_the_label() {
        let records = vec![
            record(1, Outcome::Injuries, "CLEAR"),
            record(2, Outcome::None, "RAIN"),
        ];
        let frame = Frame::from_records(&records);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.columns().len(), columns::ALL.len() - 1);
        assert!(frame.column(columns::INJURIES).is_none());
        assert_eq!(frame.outcomes(), &[Outcome::Injuries, Outcome::None]);
        assert_eq!(
            frame.require(columns::WEATHER_CONDITION).unwrap().data,
            ColumnData::Nominal(vec!["CLEAR".to_string(), "RAIN".to_string()])
        );
    }

    #[test]
    fn select_keeps_rows_in_order() {
        let records = vec![
            record(1, Outcome::Injuries, "CLEAR"),
            record(2, Outcome::None, "RAIN"),
            record(3, Outcome::None, "SNOW"),
        ];
        let frame = Frame::from_records(&records).select(&[2, 0]);
        assert_eq!(frame.outcomes(), &[Outcome::None, Outcome::Injuries]);
        assert_eq!(
            frame.require(columns::WEATHER_CONDITION).unwrap().data,
            ColumnData::Nominal(vec!["SNOW".to_string(), "CLEAR".to_string()])
        );
    }

    #[test]
    fn rejects_columns_of_the_wrong_length() {
        let err = Frame::new(
            vec![Column::new("x", ColumnData::Numeric(vec![1.0]))],
            vec![Outcome::None, Outcome::None],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::LengthMismatch { .. }));

        let mut frame = Frame::new(vec![], vec![Outcome::None]).unwrap();
        assert!(frame.push(Column::new("y", ColumnData::Numeric(vec![]))).is_err());
        assert!(frame.remove("y").is_err());
    }
}
