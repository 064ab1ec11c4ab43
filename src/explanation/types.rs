use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::features::{Feature, FEATURE_COUNT};

/// Number of reasons rendered per prediction
pub const MAX_REASONS: usize = 3;

/// Contributions smaller than this are treated as no contribution
pub const ATTRIBUTION_EPSILON: f64 = 1e-12;

/// Signed per-feature contribution toward one label's probability
///
/// Instance-specific: computed per request and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSet {
    pub label: String,
    /// Expected label probability over the background sample
    pub base_value: f64,
    /// Label probability for the explained vector
    pub prediction: f64,
    pub contributions: [f64; FEATURE_COUNT],
}

impl AttributionSet {
    pub fn get(&self, feature: Feature) -> f64 {
        self.contributions[feature.index()]
    }

    /// Sum of all contributions (equals `prediction - base_value`)
    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }

    pub fn is_finite(&self) -> bool {
        self.base_value.is_finite()
            && self.prediction.is_finite()
            && self.contributions.iter().all(|c| c.is_finite())
    }

    /// Features with the largest absolute contribution
    ///
    /// Ties keep feature order. Features with no contribution are skipped.
    pub fn top(&self, n: usize) -> SmallVec<[(Feature, f64); MAX_REASONS]> {
        let mut ranked: Vec<(Feature, f64)> = Feature::ALL
            .iter()
            .map(|&f| (f, self.get(f)))
            .filter(|(_, c)| c.abs() > ATTRIBUTION_EPSILON)
            .collect();

        ranked.sort_by(|a, b| {
            b.1.abs()
                .total_cmp(&a.1.abs())
                .then_with(|| a.0.cmp(&b.0))
        });

        ranked.into_iter().take(n).collect()
    }
}

/// Rendered explanation line for one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub feature: Feature,
    pub contribution: f64,
    pub text: String,
}

/// Top reasons behind one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub label: String,
    pub reasons: SmallVec<[Reason; MAX_REASONS]>,
}

impl Explanation {
    pub fn texts(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.text.clone()).collect()
    }
}

/// Lifecycle of the shared explainer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplainerState {
    Uninitialized,
    Initializing,
    Ready,
    /// Initialization failed; terminal for the life of the process
    Degraded,
    /// Explanations turned off by configuration
    Disabled,
}

impl ExplainerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ExplainerState::Uninitialized => 0,
            ExplainerState::Initializing => 1,
            ExplainerState::Ready => 2,
            ExplainerState::Degraded => 3,
            ExplainerState::Disabled => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ExplainerState::Uninitialized,
            1 => ExplainerState::Initializing,
            2 => ExplainerState::Ready,
            3 => ExplainerState::Degraded,
            _ => ExplainerState::Disabled,
        }
    }
}
