// Crop recommendation CLI
//
// Usage:
//   recommend [--config FILE] [--correlation-id ID] [OBSERVATION.json]
//   recommend [--config FILE] --health
//
// Reads the observation from stdin when no file is given. `--health` prints
// the readiness report and exits non-zero if the artifacts failed to load.
//
// Configuration comes from the optional JSON file, then environment
// variables (MODEL_PATH, SCALER_PATH, BACKGROUND_PATH, ENABLE_EXPLAINABILITY, ...).

use anyhow::{Context, Result};
use crop_advisor::{
    CropRecommender, RawObservation, ReadinessReport, RecommendError, RecommenderConfig,
};
use std::io::Read;
use std::path::PathBuf;

struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    correlation_id: Option<String>,
    health: bool,
}

fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        config: None,
        input: None,
        correlation_id: None,
        health: false,
    };

    let mut iter = argv.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--health" => args.health = true,
            "--config" => {
                let path = iter.next().context("--config needs a file path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--correlation-id" => {
                args.correlation_id = Some(iter.next().context("--correlation-id needs a value")?);
            }
            other if other.starts_with("--") => anyhow::bail!("Unknown flag: {}", other),
            other => args.input = Some(PathBuf::from(other)),
        }
    }

    Ok(args)
}

fn main() -> Result<()> {
    crop_advisor::logging::init();

    let args = parse_args(std::env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => RecommenderConfig::load(path)?,
        None => RecommenderConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;

    tracing::info!("Configuration:");
    tracing::info!("  MODEL_PATH: {:?}", config.model_path);
    tracing::info!("  SCALER_PATH: {:?}", config.scaler_path);
    tracing::info!("  BACKGROUND_PATH: {:?}", config.background_path);
    tracing::info!("  EXPLAINER: {:?}", config.explainer);

    let started = CropRecommender::new(&config);

    if args.health {
        let report = match &started {
            Ok(recommender) => recommender.readiness(),
            Err(e) => ReadinessReport::from_startup_error(e),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_ready() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let recommender = started.context("Failed to start recommender")?;

    let payload = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read observation file: {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read observation from stdin")?;
            buf
        }
    };

    let observation: RawObservation =
        serde_json::from_str(&payload).context("Failed to parse observation JSON")?;

    match recommender.recommend(&observation, args.correlation_id) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(RecommendError::Validation(errors)) => {
            println!("{}", serde_json::to_string_pretty(&errors)?);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
