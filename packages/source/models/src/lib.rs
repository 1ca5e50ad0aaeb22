#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw row shape of the traffic crash open-data API.
//!
//! Socrata publishes every column as a JSON string (numbers included) and
//! omits keys whose value is null or empty. Every field of [`RawCrash`] is
//! therefore optional, and numeric columns are accepted either as strings or
//! as JSON numbers so that re-loaded dumps from other tools still parse.

use serde::{Deserialize, Deserializer, Serialize};

/// One row as returned by the crash dataset API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCrash {
    /// Source record identifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub crash_record_id: Option<String>,
    /// Crash timestamp (`2023-08-18T12:50:00.000`).
    #[serde(default, deserialize_with = "lenient_string")]
    pub crash_date: Option<String>,
    /// Hour of day.
    #[serde(default, deserialize_with = "lenient_string")]
    pub crash_hour: Option<String>,
    /// Report type; empty for a large share of rows.
    #[serde(default, deserialize_with = "lenient_string")]
    pub report_type: Option<String>,
    /// Number of units involved.
    #[serde(default, deserialize_with = "lenient_string")]
    pub num_units: Option<String>,
    /// Posted speed limit.
    #[serde(default, deserialize_with = "lenient_string")]
    pub posted_speed_limit: Option<String>,
    /// Weather condition.
    #[serde(default, deserialize_with = "lenient_string")]
    pub weather_condition: Option<String>,
    /// Lighting condition.
    #[serde(default, deserialize_with = "lenient_string")]
    pub lighting_condition: Option<String>,
    /// Roadway surface condition.
    #[serde(default, deserialize_with = "lenient_string")]
    pub roadway_surface_cond: Option<String>,
    /// First crash type.
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_crash_type: Option<String>,
    /// Trafficway type.
    #[serde(default, deserialize_with = "lenient_string")]
    pub trafficway_type: Option<String>,
    /// Primary contributory cause.
    #[serde(default, deserialize_with = "lenient_string")]
    pub prim_contributory_cause: Option<String>,
    /// Total number of injuries.
    #[serde(default, deserialize_with = "lenient_string")]
    pub injuries_total: Option<String>,
    /// Latitude (WGS84).
    #[serde(default, deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    /// Longitude (WGS84).
    #[serde(default, deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
}

/// A JSON scalar that may stand in for a string column.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

/// Accepts a string, number, boolean or null and renders it as an optional
/// string.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Flag(b) => b.to_string(),
    }))
}
