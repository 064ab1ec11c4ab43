//! Recommender configuration
//!
//! Loaded from an optional JSON file, then overridden by environment
//! variables. Every field has a default, so an empty `{}` file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the lazily built explainer engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Produce reasons at all
    pub enabled: bool,
    /// Build the engine during startup instead of on the first request
    pub eager: bool,
    /// Background rows kept after sampling
    pub background_sample_size: usize,
    /// Feature orderings walked per background row
    pub permutations: usize,
    /// Seed for background sampling and permutation generation
    pub seed: u64,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            eager: false,
            background_sample_size: 100,
            permutations: 8,
            seed: 42,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub background_path: PathBuf,
    pub explainer: ExplainerConfig,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("ml_models/crop_recommendation_model.json"),
            scaler_path: PathBuf::from("ml_models/scaler.json"),
            background_path: PathBuf::from("Data/Crop_recommendation.csv"),
            explainer: ExplainerConfig::default(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl RecommenderConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents).with_context(|| "Failed to parse config JSON")
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (environment variables in production)
    ///
    /// Recognized keys: `MODEL_PATH`, `SCALER_PATH`, `BACKGROUND_PATH`,
    /// `ENABLE_EXPLAINABILITY`, `EAGER_EXPLAINER`, `EXPLAINER_SAMPLE_SIZE`,
    /// `EXPLAINER_PERMUTATIONS`, `EXPLAINER_SEED`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCALER_PATH") {
            self.scaler_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("BACKGROUND_PATH") {
            self.background_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ENABLE_EXPLAINABILITY") {
            self.explainer.enabled = parse_bool(&v)
                .with_context(|| format!("ENABLE_EXPLAINABILITY is not a boolean: '{}'", v))?;
        }
        if let Some(v) = lookup("EAGER_EXPLAINER") {
            self.explainer.eager = parse_bool(&v)
                .with_context(|| format!("EAGER_EXPLAINER is not a boolean: '{}'", v))?;
        }
        if let Some(v) = lookup("EXPLAINER_SAMPLE_SIZE") {
            self.explainer.background_sample_size = v
                .trim()
                .parse()
                .with_context(|| format!("EXPLAINER_SAMPLE_SIZE is not a count: '{}'", v))?;
        }
        if let Some(v) = lookup("EXPLAINER_PERMUTATIONS") {
            self.explainer.permutations = v
                .trim()
                .parse()
                .with_context(|| format!("EXPLAINER_PERMUTATIONS is not a count: '{}'", v))?;
        }
        if let Some(v) = lookup("EXPLAINER_SEED") {
            self.explainer.seed = v
                .trim()
                .parse()
                .with_context(|| format!("EXPLAINER_SEED is not an integer: '{}'", v))?;
        }
        Ok(())
    }
}
