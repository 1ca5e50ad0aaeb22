#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types of the exploratory crash aggregations.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use crash_injury_crash_models::Outcome;
use serde::{Deserialize, Serialize};

/// First day (Sunday) of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_sunday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Crash count for one period and outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCount {
    /// First day of the period.
    pub period: NaiveDate,
    /// Outcome label.
    pub outcome: Outcome,
    /// Number of crashes.
    pub count: u64,
}

/// Share of crashes with injuries in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRate {
    /// First day of the period.
    pub period: NaiveDate,
    /// Crashes with injuries.
    pub injuries: u64,
    /// All crashes.
    pub total: u64,
    /// `injuries / total`.
    pub rate: f64,
}

/// Crash counts for one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayBreakdown {
    /// Day of the week.
    pub weekday: Weekday,
    /// Crashes with injuries on this weekday.
    pub injuries: u64,
    /// Crashes without injuries on this weekday.
    pub none: u64,
    /// This weekday's share of all injury crashes.
    pub injuries_share: f64,
    /// This weekday's share of all non-injury crashes.
    pub none_share: f64,
    /// Share of this weekday's crashes that had injuries.
    pub injury_rate: f64,
}

/// Injury breakdown for one first-crash type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashTypeRate {
    /// First crash type.
    pub first_crash_type: String,
    /// Crashes with injuries.
    pub injuries: u64,
    /// Crashes without injuries.
    pub none: u64,
    /// All crashes of this type.
    pub total: u64,
    /// `injuries / total`.
    pub injury_rate: f64,
}

/// A located crash for the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Outcome label.
    pub outcome: Outcome,
}
