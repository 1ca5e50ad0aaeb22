#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Traffic crash record and injury outcome types.
//!
//! A [`CrashRecord`] is one cleaned row of the crash table: every retained
//! attribute is present, and the binary [`Outcome`] label has already been
//! derived from the source's injury total.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Column names of the cleaned crash table, in table order.
pub mod columns {
    /// Outcome label column.
    pub const INJURIES: &str = "injuries";
    /// Timestamp of the crash.
    pub const CRASH_DATE: &str = "crash_date";
    /// Hour of day (0-23) the crash occurred.
    pub const CRASH_HOUR: &str = "crash_hour";
    /// How the crash was reported (`ON SCENE`, `NOT ON SCENE (DESK REPORT)`, ...).
    pub const REPORT_TYPE: &str = "report_type";
    /// Number of units (vehicles, cyclists, pedestrians) involved.
    pub const NUM_UNITS: &str = "num_units";
    /// Posted speed limit at the crash location.
    pub const POSTED_SPEED_LIMIT: &str = "posted_speed_limit";
    /// Weather at the time of the crash.
    pub const WEATHER_CONDITION: &str = "weather_condition";
    /// Lighting at the time of the crash.
    pub const LIGHTING_CONDITION: &str = "lighting_condition";
    /// Road surface condition.
    pub const ROADWAY_SURFACE_COND: &str = "roadway_surface_cond";
    /// Type of the first collision (`REAR END`, `PEDESTRIAN`, ...).
    pub const FIRST_CRASH_TYPE: &str = "first_crash_type";
    /// Trafficway type (`ONE-WAY`, `DIVIDED - W/MEDIAN`, ...).
    pub const TRAFFICWAY_TYPE: &str = "trafficway_type";
    /// Primary contributory cause as judged by the reporting officer.
    pub const PRIM_CONTRIBUTORY_CAUSE: &str = "prim_contributory_cause";
    /// Latitude (WGS84).
    pub const LATITUDE: &str = "latitude";
    /// Longitude (WGS84).
    pub const LONGITUDE: &str = "longitude";

    /// Every column of the cleaned table, label first.
    pub const ALL: &[&str] = &[
        INJURIES,
        CRASH_DATE,
        CRASH_HOUR,
        REPORT_TYPE,
        NUM_UNITS,
        POSTED_SPEED_LIMIT,
        WEATHER_CONDITION,
        LIGHTING_CONDITION,
        ROADWAY_SURFACE_COND,
        FIRST_CRASH_TYPE,
        TRAFFICWAY_TYPE,
        PRIM_CONTRIBUTORY_CAUSE,
        LATITUDE,
        LONGITUDE,
    ];
}

/// Report type used when the source leaves the field empty.
pub const UNKNOWN_REPORT_TYPE: &str = "UNKNOWN";

/// Binary crash outcome: whether anybody was injured.
///
/// `Injuries` is the event class for every metric.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    /// At least one injury was reported.
    Injuries,
    /// No injuries were reported.
    None,
}

impl Outcome {
    /// Derives the label from the source's total injury count.
    #[must_use]
    pub const fn from_injuries_total(total: u32) -> Self {
        if total > 0 { Self::Injuries } else { Self::None }
    }

    /// Class index used by the classifier (`0` is the event class).
    #[must_use]
    pub const fn class_index(self) -> usize {
        match self {
            Self::Injuries => 0,
            Self::None => 1,
        }
    }

    /// Returns all variants, event class first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Injuries, Self::None]
    }
}

/// One cleaned crash record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// Derived outcome label.
    pub injuries: Outcome,
    /// When the crash occurred (local time as published).
    pub crash_date: NaiveDateTime,
    /// Hour of day, 0-23.
    pub crash_hour: u8,
    /// Report type, `UNKNOWN` when the source had none.
    pub report_type: String,
    /// Number of units involved.
    pub num_units: u32,
    /// Posted speed limit.
    pub posted_speed_limit: u32,
    /// Weather condition.
    pub weather_condition: String,
    /// Lighting condition.
    pub lighting_condition: String,
    /// Roadway surface condition.
    pub roadway_surface_cond: String,
    /// First crash type.
    pub first_crash_type: String,
    /// Trafficway type.
    pub trafficway_type: String,
    /// Primary contributory cause.
    pub prim_contributory_cause: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}
