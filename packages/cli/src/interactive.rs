//! Menu-driven front end for the pipeline steps.

use std::path::{Path, PathBuf};

use crash_injury_cli_utils::MultiProgress;
use dialoguer::{Input, Select};

use crate::config::PipelineConfig;
use crate::pipeline;

/// Top-level actions of the interactive menu.
enum Action {
    Run,
    Fetch,
    Explore,
    Train,
    Predict,
    Datasets,
    ShowConfig,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Run,
        Self::Fetch,
        Self::Explore,
        Self::Train,
        Self::Predict,
        Self::Datasets,
        Self::ShowConfig,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Run => "Run full pipeline",
            Self::Fetch => "Fetch raw crashes",
            Self::Explore => "Explore crashes",
            Self::Train => "Train and evaluate the model",
            Self::Predict => "Predict with a saved model",
            Self::Datasets => "List datasets",
            Self::ShowConfig => "Show configuration",
        }
    }
}

/// Prompts for an action and its inputs, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected step fails.
#[allow(clippy::future_not_send)]
pub async fn run(
    config: &PipelineConfig,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Crash Injury Pipeline");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Run => {
            let mut config = config.clone();
            config.source.limit = prompt_optional_u64("Record limit (empty for no limit)")?;
            let input =
                prompt_optional_path("Raw JSON dump to use instead of fetching (empty to fetch)")?;
            pipeline::run(&config, input.as_deref(), multi).await?;
        }
        Action::Fetch => {
            let mut config = config.source.clone();
            config.limit = prompt_optional_u64("Record limit (empty for no limit)")?;
            let output = prompt_path("Write raw rows to", &raw_dump_path(config.dataset.as_str()))?;
            pipeline::fetch(&config, &output, multi).await?;
        }
        Action::Explore => {
            let input = prompt_optional_path("Raw JSON dump (empty to fetch)")?;
            let raw = pipeline::acquire(&config.source, input.as_deref(), multi).await?;
            let records = pipeline::prepare(&raw);
            pipeline::explore(&records, &config.explore, &config.output_dir)?;
        }
        Action::Train => {
            let input = prompt_optional_path("Raw JSON dump (empty to fetch)")?;
            let raw = pipeline::acquire(&config.source, input.as_deref(), multi).await?;
            let records = pipeline::prepare(&raw);
            let model = pipeline::train(&records, config, None, multi)?;
            println!("Model saved to {}", model.display());
        }
        Action::Predict => {
            let model = prompt_path(
                "Model artifact",
                &config.output_dir.join(pipeline::MODEL_FILE),
            )?;
            let input = prompt_path("Raw JSON rows to score", Path::new("raw.json"))?;
            let raw = pipeline::acquire(&config.source, Some(&input), multi).await?;
            let records = pipeline::prepare(&raw);
            pipeline::predict(&records, &model)?;
        }
        Action::Datasets => pipeline::list_datasets(),
        Action::ShowConfig => println!("{}", config.to_toml()?),
    }

    Ok(())
}

fn raw_dump_path(dataset: &str) -> PathBuf {
    PathBuf::from(format!("{dataset}.json"))
}

fn prompt_optional_u64(prompt: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}

fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok((!input.is_empty()).then(|| PathBuf::from(input)))
}

fn prompt_path(prompt: &str, default: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(input.trim()))
}
