//! Normalization Utilities
//!
//! Applies the per-feature standardization fitted at training time. The
//! statistics are loaded once from the scaler artifact and shared read-only
//! by every request.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::StartupError;
use crate::features::{feature_names, EngineeredFeatureVector, Feature, FEATURE_COUNT};

/// Per-feature (mean, std) pairs from the scaler artifact
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScalingStatistics {
    /// Artifact version shared with the classifier artifact
    pub artifact_version: String,

    /// Feature names in the order the statistics were fitted
    pub feature_names: Vec<String>,

    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Standardized feature vector, the classifier's input space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledVector {
    values: [f64; FEATURE_COUNT],
}

impl ScaledVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }
}

impl ScalingStatistics {
    /// Load scaler statistics from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler file: {:?}", path))?;

        let stats: ScalingStatistics = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse scaler JSON")?;

        if stats.mean.len() != stats.feature_names.len()
            || stats.std.len() != stats.feature_names.len()
        {
            anyhow::bail!(
                "Scaler has {} names but {} means and {} stds",
                stats.feature_names.len(),
                stats.mean.len(),
                stats.std.len()
            );
        }

        Ok(stats)
    }

    /// Identity statistics (mean 0, std 1) for the current feature set
    pub fn identity(artifact_version: &str) -> Self {
        Self {
            artifact_version: artifact_version.to_string(),
            feature_names: feature_names().iter().map(|s| s.to_string()).collect(),
            mean: vec![0.0; FEATURE_COUNT],
            std: vec![1.0; FEATURE_COUNT],
        }
    }

    /// Verify the statistics describe exactly the engineered feature vector
    ///
    /// Compares against `Feature::ALL` in place; runs on every `scale` call.
    pub fn check_compatible(&self) -> Result<(), StartupError> {
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(StartupError::Configuration(format!(
                "scaler has {} features, feature vector has {}",
                self.feature_names.len(),
                FEATURE_COUNT
            )));
        }

        if let Some((i, (got, want))) = self
            .feature_names
            .iter()
            .zip(Feature::ALL)
            .enumerate()
            .find(|(_, (got, want))| got.as_str() != want.name())
        {
            return Err(StartupError::Configuration(format!(
                "scaler feature {} is '{}', expected '{}'",
                i,
                got,
                want.name()
            )));
        }

        if self.mean.len() != FEATURE_COUNT || self.std.len() != FEATURE_COUNT {
            return Err(StartupError::Configuration(format!(
                "scaler has {} means and {} stds for {} features",
                self.mean.len(),
                self.std.len(),
                FEATURE_COUNT
            )));
        }

        Ok(())
    }
}

/// Standardize an engineered vector: `(x - mean) / std`
///
/// A zero or non-finite std is treated as 1.0 (constant feature at fit time).
pub fn scale(
    vector: &EngineeredFeatureVector,
    stats: &ScalingStatistics,
) -> Result<ScaledVector, StartupError> {
    stats.check_compatible()?;

    let mut values = [0.0; FEATURE_COUNT];
    for (i, x) in vector.values().iter().enumerate() {
        let std = match stats.std[i] {
            s if s.is_finite() && s != 0.0 => s,
            _ => 1.0,
        };
        values[i] = (x - stats.mean[i]) / std;
    }

    Ok(ScaledVector { values })
}
