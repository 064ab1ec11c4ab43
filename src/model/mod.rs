//! Classifier model and its output distribution
//!
//! The serving path uses a single model family: a random forest whose trees
//! were fitted offline. See `forest` for the artifact format.

pub mod forest;

pub use forest::{DecisionTree, RandomForest, TreeNode};

use serde::{Deserialize, Serialize};

/// Tolerance used when checking that probabilities sum to one
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// One (label, probability) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

/// Probability distribution over the model's label set, in label order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    entries: Vec<LabelProbability>,
}

impl ProbabilityDistribution {
    pub fn new(entries: Vec<LabelProbability>) -> Self {
        Self { entries }
    }

    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(label, probability)| LabelProbability {
                    label: label.into(),
                    probability,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[LabelProbability] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.probability).sum()
    }

    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.probability)
    }

    /// Non-negative and summing to one within tolerance
    pub fn is_normalized(&self) -> bool {
        self.entries.iter().all(|e| e.probability >= 0.0)
            && (self.total() - 1.0).abs() <= PROBABILITY_TOLERANCE
    }
}
