#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exploratory aggregations over cleaned crash records.
//!
//! Every function here is a pure view of a `&[CrashRecord]` slice: weekly
//! counts and injury rates (with the possibly partial first and last week
//! removed), the weekday distribution, injury rates by first-crash type, and
//! the located points for the map.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use crash_injury_analytics_models::{
    CrashPoint, CrashTypeRate, PeriodCount, PeriodRate, WeekdayBreakdown, week_start,
};
use crash_injury_crash_models::{CrashRecord, Outcome};

/// Crash types with at most this many crashes are left out of
/// [`crash_type_rates`] by default.
pub const DEFAULT_CRASH_TYPE_MIN_TOTAL: u64 = 10_000;

/// Weekdays in display order.
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// `(injuries, none)` counts keyed by week start.
fn tally_by_week(records: &[CrashRecord]) -> BTreeMap<NaiveDate, [u64; 2]> {
    let mut tally: BTreeMap<NaiveDate, [u64; 2]> = BTreeMap::new();
    for record in records {
        let period = week_start(record.crash_date.date());
        tally.entry(period).or_default()[record.injuries.class_index()] += 1;
    }
    tally
}

/// Removes the earliest and latest period, which may be partially covered
/// by the query window.
fn trim_partial_periods(tally: &mut BTreeMap<NaiveDate, [u64; 2]>) {
    tally.pop_first();
    tally.pop_last();
}

/// Only `(period, outcome)` pairs that occur are returned, oldest first.
fn flatten_counts(tally: &BTreeMap<NaiveDate, [u64; 2]>) -> Vec<PeriodCount> {
    tally
        .iter()
        .flat_map(|(&period, counts)| {
            Outcome::all()
                .iter()
                .filter(move |o| counts[o.class_index()] > 0)
                .map(move |&outcome| PeriodCount {
                    period,
                    outcome,
                    count: counts[outcome.class_index()],
                })
        })
        .collect()
}

/// Weekly crash counts by outcome, excluding the first and last week.
#[must_use]
pub fn weekly_counts(records: &[CrashRecord]) -> Vec<PeriodCount> {
    let mut tally = tally_by_week(records);
    trim_partial_periods(&mut tally);
    flatten_counts(&tally)
}

/// Weekly share of crashes with injuries, excluding the first and last week.
#[must_use]
pub fn weekly_injury_rate(records: &[CrashRecord]) -> Vec<PeriodRate> {
    let mut tally = tally_by_week(records);
    trim_partial_periods(&mut tally);
    tally
        .into_iter()
        .map(|(period, [injuries, none])| PeriodRate {
            period,
            injuries,
            total: injuries + none,
            rate: ratio(injuries, injuries + none),
        })
        .collect()
}

/// Per-weekday counts, Sunday first.
///
/// `injuries_share`/`none_share` distribute each outcome across the week;
/// `injury_rate` is the share of a weekday's crashes that had injuries.
#[must_use]
pub fn weekday_distribution(records: &[CrashRecord]) -> Vec<WeekdayBreakdown> {
    let mut counts = [[0u64; 2]; 7];
    for record in records {
        let day = record.crash_date.weekday().num_days_from_sunday() as usize;
        counts[day][record.injuries.class_index()] += 1;
    }
    let total_injuries: u64 = counts.iter().map(|c| c[0]).sum();
    let total_none: u64 = counts.iter().map(|c| c[1]).sum();

    WEEKDAYS
        .iter()
        .zip(counts)
        .map(|(&weekday, [injuries, none])| WeekdayBreakdown {
            weekday,
            injuries,
            none,
            injuries_share: ratio(injuries, total_injuries),
            none_share: ratio(none, total_none),
            injury_rate: ratio(injuries, injuries + none),
        })
        .collect()
}

/// Injury rate per first-crash type, for types with more than `min_total`
/// crashes, highest rate first.
#[must_use]
pub fn crash_type_rates(records: &[CrashRecord], min_total: u64) -> Vec<CrashTypeRate> {
    let mut tally: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
    for record in records {
        tally.entry(record.first_crash_type.as_str()).or_default()
            [record.injuries.class_index()] += 1;
    }

    let mut rates: Vec<CrashTypeRate> = tally
        .into_iter()
        .filter(|(_, [injuries, none])| injuries + none > min_total)
        .map(|(crash_type, [injuries, none])| CrashTypeRate {
            first_crash_type: crash_type.to_string(),
            injuries,
            none,
            total: injuries + none,
            injury_rate: ratio(injuries, injuries + none),
        })
        .collect();
    rates.sort_by(|a, b| {
        b.injury_rate
            .total_cmp(&a.injury_rate)
            .then_with(|| a.first_crash_type.cmp(&b.first_crash_type))
    });

    log::debug!(
        "{} crash types above {min_total} crashes",
        rates.len()
    );
    rates
}

/// Located crashes for the map view. Rows with a non-positive latitude are
/// placeholders in the source and are skipped.
#[must_use]
pub fn crash_points(records: &[CrashRecord]) -> Vec<CrashPoint> {
    records
        .iter()
        .filter(|r| r.latitude > 0.0)
        .map(|r| CrashPoint {
            latitude: r.latitude,
            longitude: r.longitude,
            outcome: r.injuries,
        })
        .collect()
}
