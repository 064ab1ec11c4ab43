//! Error taxonomy for the recommendation core
//!
//! Startup errors stop the process from serving. Request errors reject a
//! single request. Explanation errors never escape a prediction: they only
//! degrade the `reasons` field of an otherwise successful result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Artifact problems detected while constructing the recommender
#[derive(Debug, Error)]
pub enum StartupError {
    /// Scaler statistics and feature vector disagree (artifact version skew)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Classifier artifact missing or corrupt
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Scaler artifact missing or corrupt
    #[error("scaler unavailable: {0}")]
    ScalerUnavailable(String),
}

/// Single domain-bound violation on one input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Complete list of input violations (never just the first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Field names in the order they were reported
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid field(s): ", self.violations.len())?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

/// Explanation failures. Non-fatal by construction.
#[derive(Debug, Clone, Error)]
pub enum ExplainError {
    #[error("explainer initialization failed: {0}")]
    Init(String),

    #[error("attribution failed: {0}")]
    Attribution(String),

    #[error("explanations are disabled")]
    Disabled,
}

/// Ranking failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("probability distribution is empty")]
    EmptyDistribution,
}

/// Per-request failures returned instead of a PredictionResult
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Rank(#[from] RankError),

    /// Artifact skew surfacing mid-request; unreachable after a clean startup
    #[error(transparent)]
    Startup(#[from] StartupError),
}
