//! `plotly` figures for the exploratory views and model evaluation.

use std::path::Path;

use crash_injury_analytics_models::{
    CrashPoint, CrashTypeRate, PeriodCount, PeriodRate, WeekdayBreakdown,
};
use crash_injury_crash_models::Outcome;
use crash_injury_model_models::{RocPoint, VariableImportance};
use plotly::common::{DashType, ErrorData, ErrorType, Line, Marker, Mode, Orientation};
use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, Plot, Scatter};

use crate::ReportError;

/// Shares in `0..=1` are plotted as percentages.
const fn percent(share: f64) -> f64 {
    share * 100.0
}

fn layout(title: &str, x_title: &str, y_title: &str) -> Layout {
    Layout::new()
        .title(title)
        .x_axis(Axis::new().title(x_title))
        .y_axis(Axis::new().title(y_title))
}

/// Weekly crash counts, one line per outcome.
#[must_use]
pub fn weekly_counts_chart(counts: &[PeriodCount]) -> Plot {
    let mut plot = Plot::new();
    for &outcome in Outcome::all() {
        let (weeks, values): (Vec<String>, Vec<u64>) = counts
            .iter()
            .filter(|c| c.outcome == outcome)
            .map(|c| (c.period.to_string(), c.count))
            .unzip();
        plot.add_trace(
            Scatter::new(weeks, values)
                .mode(Mode::Lines)
                .name(&outcome.to_string()),
        );
    }
    plot.set_layout(layout(
        "Traffic crashes per week",
        "Week",
        "Number of crashes",
    ));
    plot
}

/// Weekly share of crashes with injuries.
#[must_use]
pub fn weekly_rate_chart(rates: &[PeriodRate]) -> Plot {
    let (weeks, values): (Vec<String>, Vec<f64>) = rates
        .iter()
        .map(|r| (r.period.to_string(), percent(r.rate)))
        .unzip();
    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(weeks, values)
            .mode(Mode::Lines)
            .name("injury rate"),
    );
    plot.set_layout(layout(
        "Share of crashes with injuries per week",
        "Week",
        "% of crashes with injuries",
    ));
    plot
}

/// Each outcome's distribution across the days of the week.
#[must_use]
pub fn weekday_chart(days: &[WeekdayBreakdown]) -> Plot {
    let labels: Vec<String> = days.iter().map(|d| d.weekday.to_string()).collect();
    let injuries: Vec<f64> = days.iter().map(|d| percent(d.injuries_share)).collect();
    let none: Vec<f64> = days.iter().map(|d| percent(d.none_share)).collect();
    let mut plot = Plot::new();
    plot.add_trace(Bar::new(labels.clone(), injuries).name(&Outcome::Injuries.to_string()));
    plot.add_trace(Bar::new(labels, none).name(&Outcome::None.to_string()));
    plot.set_layout(
        layout(
            "How do injury rates change through the week?",
            "Day of week",
            "% of the outcome's crashes",
        )
        .bar_mode(BarMode::Group),
    );
    plot
}

/// Injury rate per first-crash type, highest first from the top.
#[must_use]
pub fn crash_type_chart(rates: &[CrashTypeRate]) -> Plot {
    let (values, names): (Vec<f64>, Vec<String>) = rates
        .iter()
        .rev()
        .map(|r| (percent(r.injury_rate), r.first_crash_type.clone()))
        .unzip();
    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(values, names)
            .orientation(Orientation::Horizontal)
            .name("injury rate"),
    );
    plot.set_layout(layout(
        "Injury rate by type of first crash",
        "% of crashes with injuries",
        "",
    ));
    plot
}

/// Crash locations, one marker trace per outcome.
#[must_use]
pub fn crash_map(points: &[CrashPoint]) -> Plot {
    let mut plot = Plot::new();
    for &outcome in Outcome::all() {
        let (lon, lat): (Vec<f64>, Vec<f64>) = points
            .iter()
            .filter(|p| p.outcome == outcome)
            .map(|p| (p.longitude, p.latitude))
            .unzip();
        plot.add_trace(
            Scatter::new(lon, lat)
                .mode(Mode::Markers)
                .marker(Marker::new().size(3))
                .opacity(0.3)
                .name(&outcome.to_string()),
        );
    }
    plot.set_layout(layout("Crash locations", "Longitude", "Latitude"));
    plot
}

/// Variable importance with standard-error bars, most important on top.
#[must_use]
pub fn importance_chart(importance: &[VariableImportance]) -> Plot {
    let values: Vec<f64> = importance.iter().rev().map(|v| v.value).collect();
    let terms: Vec<String> = importance.iter().rev().map(|v| v.term.clone()).collect();
    let errors: Vec<f64> = importance.iter().rev().map(|v| v.std_err).collect();
    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(values, terms)
            .orientation(Orientation::Horizontal)
            .error_x(ErrorData::new(ErrorType::Data).array(errors))
            .name("importance"),
    );
    plot.set_layout(layout("Variable importance", "Importance", ""));
    plot
}

/// ROC curve with the chance diagonal.
#[must_use]
pub fn roc_chart(curve: &[RocPoint]) -> Plot {
    let (fpr, tpr): (Vec<f64>, Vec<f64>) = curve
        .iter()
        .map(|p| (1.0 - p.specificity, p.sensitivity))
        .unzip();
    let mut plot = Plot::new();
    plot.add_trace(Scatter::new(fpr, tpr).mode(Mode::Lines).name("roc"));
    plot.add_trace(
        Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
            .mode(Mode::Lines)
            .line(Line::new().dash(DashType::Dash))
            .name("chance"),
    );
    plot.set_layout(layout(
        "ROC curve",
        "1 - specificity",
        "sensitivity",
    ));
    plot
}

/// Writes `plot` as a standalone HTML page.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the file cannot be written.
pub fn write_html(plot: &Plot, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, plot.to_html())?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;

    #[test]
    fn weekly_counts_have_a_trace_per_outcome() {
        let week = NaiveDate::from_ymd_opt(2023, 3, 12).unwrap();
        let counts = vec![
            PeriodCount {
                period: week,
                outcome: Outcome::Injuries,
                count: 4,
            },
            PeriodCount {
                period: week,
                outcome: Outcome::None,
                count: 40,
            },
        ];
        let html = weekly_counts_chart(&counts).to_html();
        assert!(html.contains("2023-03-12"));
        assert!(html.contains("\"injuries\""));
        assert!(html.contains("\"none\""));
    }

    #[test]
    fn weekday_chart_labels_days() {
        let days = vec![WeekdayBreakdown {
            weekday: Weekday::Sun,
            injuries: 1,
            none: 3,
            injuries_share: 0.5,
            none_share: 0.25,
            injury_rate: 0.25,
        }];
        let html = weekday_chart(&days).to_html();
        assert!(html.contains("Sun"));
    }

    #[test]
    fn shares_are_plotted_as_percentages() {
        let days = vec![WeekdayBreakdown {
            weekday: Weekday::Mon,
            injuries: 3,
            none: 5,
            injuries_share: 0.375,
            none_share: 0.625,
            injury_rate: 0.375,
        }];
        let html = weekday_chart(&days).to_html();
        assert!(html.contains("37.5"));
        assert!(html.contains("62.5"));
        assert!(!html.contains("0.375"));

        let rates = vec![CrashTypeRate {
            first_crash_type: "PEDESTRIAN".to_string(),
            injuries: 3,
            none: 5,
            total: 8,
            injury_rate: 0.375,
        }];
        let html = crash_type_chart(&rates).to_html();
        assert!(html.contains("37.5"));
        assert!(!html.contains("0.375"));
    }

    #[test]
    fn charts_are_written_as_html() {
        let curve = vec![
            RocPoint {
                threshold: f64::NEG_INFINITY,
                specificity: 0.0,
                sensitivity: 1.0,
            },
            RocPoint {
                threshold: f64::INFINITY,
                specificity: 1.0,
                sensitivity: 0.0,
            },
        ];
        let path = std::env::temp_dir().join(format!("crash_injury_roc_{}.html", std::process::id()));
        write_html(&roc_chart(&curve), &path).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(html.contains("ROC curve"));
        assert!(html.contains("chance"));
    }
}
