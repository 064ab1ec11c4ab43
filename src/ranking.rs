//! Ranker
//!
//! Derives the top recommendation, its confidence and suitability tier, and
//! up to three fallback alternatives from a probability distribution.
//!
//! Ordering everywhere is probability descending, then label ascending, so
//! ties resolve to the lexicographically smallest label.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;

use crate::error::RankError;
use crate::model::{LabelProbability, ProbabilityDistribution};

/// Probability at or above which a crop is highly suitable
pub const HIGH_THRESHOLD: f64 = 0.75;

/// Probability at or above which a crop is moderately suitable
pub const MODERATE_THRESHOLD: f64 = 0.40;

/// Alternatives must be strictly above this probability
pub const MIN_ALTERNATIVE_PROBABILITY: f64 = 0.01;

/// Maximum number of alternatives returned
pub const MAX_ALTERNATIVES: usize = 3;

/// Coarse confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuitabilityTier {
    High,
    Moderate,
    Low,
}

impl SuitabilityTier {
    /// Tier for a probability in [0, 1]
    pub fn from_probability(probability: f64) -> Self {
        match probability {
            p if p >= HIGH_THRESHOLD => SuitabilityTier::High,
            p if p >= MODERATE_THRESHOLD => SuitabilityTier::Moderate,
            _ => SuitabilityTier::Low,
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            SuitabilityTier::High => "High",
            SuitabilityTier::Moderate => "Moderate",
            SuitabilityTier::Low => "Low",
        }
    }
}

/// Fallback crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub crop: String,
    pub probability: f64,
    pub suitability_tier: SuitabilityTier,
}

/// Ranking output: everything in a PredictionResult except reasons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub crop: String,
    pub probability: f64,
    pub confidence: u8,
    pub suitability_tier: SuitabilityTier,
    pub alternatives: SmallVec<[Alternative; MAX_ALTERNATIVES]>,
}

/// `round(probability * 100)` clamped to [0, 100]
pub fn confidence_percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

fn rank_order(a: &LabelProbability, b: &LabelProbability) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| a.label.cmp(&b.label))
}

/// Rank a probability distribution
pub fn rank(dist: &ProbabilityDistribution) -> Result<RankedPrediction, RankError> {
    let mut ordered: Vec<&LabelProbability> = dist.entries().iter().collect();
    ordered.sort_by(|a, b| rank_order(a, b));

    let (top, rest) = ordered
        .split_first()
        .ok_or(RankError::EmptyDistribution)?;

    let alternatives = rest
        .iter()
        .filter(|e| e.probability > MIN_ALTERNATIVE_PROBABILITY)
        .take(MAX_ALTERNATIVES)
        .map(|e| Alternative {
            crop: e.label.clone(),
            probability: e.probability,
            suitability_tier: SuitabilityTier::from_probability(e.probability),
        })
        .collect();

    Ok(RankedPrediction {
        crop: top.label.clone(),
        probability: top.probability,
        confidence: confidence_percent(top.probability),
        suitability_tier: SuitabilityTier::from_probability(top.probability),
        alternatives,
    })
}
