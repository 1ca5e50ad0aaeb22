#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Cleaning and label derivation for raw traffic crash rows.
//!
//! [`clean`] projects each [`RawCrash`] onto the retained columns, derives
//! the [`Outcome`] label from `injuries_total`, normalizes an empty report
//! type to `UNKNOWN`, and silently drops every row with a missing value.
//! The surviving records are ordered newest first.

use std::cmp::Reverse;

use crash_injury_crash_models::{CrashRecord, Outcome, UNKNOWN_REPORT_TYPE};
use crash_injury_source::parsing::{parse_coordinate, parse_count, parse_socrata_timestamp};
use crash_injury_source_models::RawCrash;
use serde::Serialize;

/// Row counts from one cleaning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleanSummary {
    /// Rows received.
    pub raw: usize,
    /// Rows retained.
    pub kept: usize,
    /// Rows dropped for a missing or unparseable value.
    pub dropped: usize,
}

/// Cleans raw API rows into complete, labelled crash records sorted by
/// descending crash date.
#[must_use]
pub fn clean(raw: &[RawCrash]) -> (Vec<CrashRecord>, CleanSummary) {
    let mut records: Vec<CrashRecord> = raw.iter().filter_map(clean_row).collect();
    records.sort_by_key(|r| Reverse(r.crash_date));

    let summary = CleanSummary {
        raw: raw.len(),
        kept: records.len(),
        dropped: raw.len() - records.len(),
    };
    log::info!(
        "Cleaned {} rows: kept {}, dropped {} incomplete",
        summary.raw,
        summary.kept,
        summary.dropped
    );

    (records, summary)
}

/// Converts one raw row, or returns `None` if any retained value is missing.
#[must_use]
pub fn clean_row(row: &RawCrash) -> Option<CrashRecord> {
    let injuries = Outcome::from_injuries_total(parse_count(row.injuries_total.as_deref()?)?);
    let crash_date = parse_socrata_timestamp(row.crash_date.as_deref()?)?;
    let crash_hour = u8::try_from(parse_count(row.crash_hour.as_deref()?)?)
        .ok()
        .filter(|h| *h < 24)?;

    let report_type = match row.report_type.as_deref().map(str::trim) {
        None | Some("") => UNKNOWN_REPORT_TYPE.to_string(),
        Some(other) => other.to_string(),
    };

    Some(CrashRecord {
        injuries,
        crash_date,
        crash_hour,
        report_type,
        num_units: parse_count(row.num_units.as_deref()?)?,
        posted_speed_limit: parse_count(row.posted_speed_limit.as_deref()?)?,
        weather_condition: row.weather_condition.clone()?,
        lighting_condition: row.lighting_condition.clone()?,
        roadway_surface_cond: row.roadway_surface_cond.clone()?,
        first_crash_type: row.first_crash_type.clone()?,
        trafficway_type: row.trafficway_type.clone()?,
        prim_contributory_cause: row.prim_contributory_cause.clone()?,
        latitude: parse_coordinate(row.latitude.as_deref()?)?,
        longitude: parse_coordinate(row.longitude.as_deref()?)?,
    })
}

/// Counts records per outcome, event class first.
#[must_use]
pub fn outcome_counts(records: &[CrashRecord]) -> [(Outcome, usize); 2] {
    [Outcome::Injuries, Outcome::None].map(|outcome| {
        (
            outcome,
            records.iter().filter(|r| r.injuries == outcome).count(),
        )
    })
}
