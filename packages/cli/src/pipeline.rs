//! The pipeline steps: acquire, explore, train, predict.
//!
//! Each step is usable on its own (from a subcommand or the interactive
//! menu) and [`run`] chains acquire, explore and train.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crash_injury_analytics::{
    crash_points, crash_type_rates, weekday_distribution, weekly_counts, weekly_injury_rate,
};
use crash_injury_clean::{clean, outcome_counts};
use crash_injury_cli_utils::{IndicatifProgress, MultiProgress};
use crash_injury_crash_models::CrashRecord;
use crash_injury_model::frame::Frame;
use crash_injury_model::metrics::roc_curve;
use crash_injury_model::resample::{fit_resamples, last_fit};
use crash_injury_model::split::{initial_split, vfold_cv};
use crash_injury_model::workflow::{FittedWorkflow, Workflow};
use crash_injury_model_models::{MetricEstimate, MetricSummary};
use crash_injury_report::{charts, export};
use crash_injury_source::registry::{all_datasets, find_dataset};
use crash_injury_source::socrata::fetch_socrata;
use crash_injury_source::{FetchOptions, load_raw, lookback_since, save_raw};
use crash_injury_source_models::RawCrash;

use crate::config::{ExploreConfig, PipelineConfig, SourceConfig};

/// File name of the model artifact inside the output directory.
pub const MODEL_FILE: &str = "model.msgpack";

/// Loads raw rows from `input` if given, otherwise fetches them from the
/// configured dataset.
///
/// # Errors
///
/// Returns an error if the dump cannot be read or the API request fails.
#[allow(clippy::future_not_send)]
pub async fn acquire(
    config: &SourceConfig,
    input: Option<&Path>,
    multi: &MultiProgress,
) -> Result<Vec<RawCrash>, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        return Ok(load_raw(path)?);
    }

    let dataset = find_dataset(&config.dataset)?;
    let since = lookback_since(chrono::Local::now().date_naive(), config.lookback_years);
    log::info!("Fetching {} crashes since {since}", dataset.name());

    let options = FetchOptions {
        since: Some(since),
        limit: config.limit,
        app_token: config.app_token.clone(),
        retry: config.retry,
    };
    let progress = IndicatifProgress::records_bar(multi, "Downloading");
    Ok(fetch_socrata(&dataset, &options, progress).await?)
}

/// Fetches raw rows and writes them to `output` as JSON.
///
/// # Errors
///
/// Returns an error if the fetch or the write fails.
#[allow(clippy::future_not_send)]
pub async fn fetch(
    config: &SourceConfig,
    output: &Path,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = acquire(config, None, multi).await?;
    save_raw(output, &raw)?;
    Ok(())
}

/// Prints the registered datasets with their endpoints.
pub fn list_datasets() {
    println!("{:<28} NAME", "ID");
    println!("{}", "-".repeat(60));
    for dataset in all_datasets() {
        println!("{:<28} {}", dataset.id(), dataset.name());
        println!("{:<28} api:    {}", "", dataset.api_url());
        if let Some(portal) = dataset.portal_url() {
            println!("{:<28} portal: {portal}", "");
        }
    }
}

/// Cleans raw rows and reports the label balance.
#[must_use]
pub fn prepare(raw: &[RawCrash]) -> Vec<CrashRecord> {
    let (records, _) = clean(raw);
    for (outcome, count) in outcome_counts(&records) {
        log::info!("{outcome}: {count} crashes");
    }
    records
}

/// Renders the exploratory charts into `output_dir`.
///
/// # Errors
///
/// Returns an error if the directory or a chart cannot be written.
pub fn explore(
    records: &[CrashRecord],
    config: &ExploreConfig,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(output_dir)?;

    charts::write_html(
        &charts::weekly_counts_chart(&weekly_counts(records)),
        &output_dir.join("weekly_counts.html"),
    )?;
    charts::write_html(
        &charts::weekly_rate_chart(&weekly_injury_rate(records)),
        &output_dir.join("weekly_injury_rate.html"),
    )?;

    let weekdays = weekday_distribution(records);
    println!();
    println!("{:<5} {:>10} {:>10} {:>12}", "DAY", "INJURIES", "NONE", "INJURY RATE");
    for day in &weekdays {
        println!(
            "{:<5} {:>10} {:>10} {:>11.1}%",
            day.weekday.to_string(),
            day.injuries,
            day.none,
            day.injury_rate * 100.0
        );
    }
    charts::write_html(
        &charts::weekday_chart(&weekdays),
        &output_dir.join("weekday.html"),
    )?;

    charts::write_html(
        &charts::crash_type_chart(&crash_type_rates(records, config.crash_type_min_total)),
        &output_dir.join("crash_types.html"),
    )?;
    charts::write_html(
        &charts::crash_map(&crash_points(records)),
        &output_dir.join("crash_map.html"),
    )?;

    log::info!("Exploration charts written to {}", output_dir.display());
    Ok(())
}

/// Splits, cross-validates, fits the final model, and writes metrics,
/// predictions, importance, the ROC curve and the model artifact.
///
/// Returns the path of the saved model.
///
/// # Errors
///
/// Returns an error if any split, fit or write fails.
pub fn train(
    records: &[CrashRecord],
    config: &PipelineConfig,
    model_path: Option<&Path>,
    multi: &MultiProgress,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let model_config = &config.model;
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir)?;
    let start = Instant::now();

    let frame = Frame::from_records(records);
    let split = initial_split(frame.outcomes(), model_config.train_prop, model_config.split_seed)?;
    let training = frame.select(split.training());
    log::info!(
        "{} training rows, {} testing rows",
        split.training().len(),
        split.testing().len()
    );

    let folds = vfold_cv(training.outcomes(), model_config.folds, model_config.fold_seed)?;
    let workflow = Workflow::from_config(model_config);

    let progress = IndicatifProgress::steps_bar(multi, "Cross-validation");
    let resamples = fit_resamples(&workflow, &training, &folds, &progress)?;
    let summaries = resamples.collect_metrics();
    print_summaries(&summaries);
    export::write_metric_summaries(&output_dir.join("resample_metrics.csv"), &summaries)?;
    export::write_predictions(
        &output_dir.join("resample_predictions.csv"),
        &resamples.collect_predictions(),
    )?;
    export::write_confusion(
        &output_dir.join("resample_confusion.csv"),
        &resamples.conf_mat_resampled(),
    )?;

    let last = last_fit(&workflow, &frame, &split)?;
    print_estimates(&last.metrics);
    export::write_metric_estimates(&output_dir.join("test_metrics.csv"), &last.metrics)?;
    export::write_predictions(&output_dir.join("test_predictions.csv"), &last.predictions)?;

    let importance = last.workflow.variable_importance(model_config.top_n_importance);
    export::write_importance(&output_dir.join("importance.csv"), &importance)?;
    charts::write_html(
        &charts::importance_chart(&importance),
        &output_dir.join("importance.html"),
    )?;

    let curve = roc_curve(&last.predictions);
    export::write_roc(&output_dir.join("roc_curve.csv"), &curve)?;
    charts::write_html(&charts::roc_chart(&curve), &output_dir.join("roc_curve.html"))?;

    let model_path = model_path.map_or_else(|| output_dir.join(MODEL_FILE), Path::to_path_buf);
    last.workflow.save(&model_path)?;

    log::info!("Training finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(model_path)
}

/// Prints class probabilities for `records` from a saved model.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded or prediction fails.
pub fn predict(records: &[CrashRecord], model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = FittedWorkflow::load(model_path)?;
    let frame = Frame::from_records(records);
    let rows: Vec<usize> = (0..frame.len()).collect();
    let predictions = workflow.predict(&frame, &rows, None)?;

    println!("{:<6} {:>14} {:>10} {:<10} TRUTH", "ROW", "PRED_INJURIES", "PRED_NONE", "PREDICTED");
    for p in &predictions {
        println!(
            "{:<6} {:>14.3} {:>10.3} {:<10} {}",
            p.row,
            p.pred_injuries,
            p.pred_none,
            p.predicted.to_string(),
            p.truth
        );
    }
    Ok(())
}

/// Acquire, clean, explore and train in one go.
///
/// # Errors
///
/// Returns the first error of any step.
#[allow(clippy::future_not_send)]
pub async fn run(
    config: &PipelineConfig,
    input: Option<&Path>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline_start = Instant::now();

    let raw = acquire(&config.source, input, multi).await?;
    let records = prepare(&raw);
    explore(&records, &config.explore, &config.output_dir)?;
    let model_path = train(&records, config, None, multi)?;

    println!();
    println!(
        "Pipeline complete in {:.1}s; model saved to {}",
        pipeline_start.elapsed().as_secs_f64(),
        model_path.display()
    );
    Ok(())
}

fn print_summaries(summaries: &[MetricSummary]) {
    println!();
    println!("Cross-validation");
    println!("{:<12} {:>8} {:>8} {:>4}", "METRIC", "MEAN", "STD_ERR", "N");
    for s in summaries {
        println!(
            "{:<12} {:>8.3} {:>8} {:>4}",
            s.metric.to_string(),
            s.mean,
            s.std_err.map_or_else(|| "-".to_string(), |e| format!("{e:.4}")),
            s.n
        );
    }
}

fn print_estimates(estimates: &[MetricEstimate]) {
    println!();
    println!("Test split");
    println!("{:<12} {:>8}", "METRIC", "ESTIMATE");
    for e in estimates {
        println!("{:<12} {:>8.3}", e.metric.to_string(), e.estimate);
    }
}
