//! Explainer engine
//!
//! The expensive, shared part of explanation: the background reference
//! sample (engineered and scaled like a request), the expected probability
//! of every label over that sample, and a fixed set of feature permutations.
//! Built once from a `BackgroundSource`, read-only afterwards.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::attribution::shapley_values;
use super::types::AttributionSet;
use crate::config::ExplainerConfig;
use crate::data::BackgroundSource;
use crate::error::ExplainError;
use crate::features::{engineer, FEATURE_COUNT};
use crate::model::RandomForest;
use crate::utils::{scale, ScaledVector, ScalingStatistics};

#[derive(Debug, Clone)]
pub struct ExplainerEngine {
    background: Vec<[f64; FEATURE_COUNT]>,
    permutations: Vec<[usize; FEATURE_COUNT]>,
    /// Mean probability of each label over the background, in label order
    expected: Vec<f64>,
}

impl ExplainerEngine {
    /// Read, prepare and sample the background dataset
    pub fn build(
        source: &dyn BackgroundSource,
        model: &RandomForest,
        stats: &ScalingStatistics,
        config: &ExplainerConfig,
    ) -> Result<Self, ExplainError> {
        if config.permutations == 0 {
            return Err(ExplainError::Init("at least one permutation is required".to_string()));
        }

        let raw = source
            .load()
            .map_err(|e| ExplainError::Init(format!("{:#}", e)))?;
        let loaded = raw.len();

        let mut rows = Vec::with_capacity(loaded);
        for obs in raw.iter().filter(|obs| obs.validate().is_ok()) {
            let scaled = scale(&engineer(obs), stats)
                .map_err(|e| ExplainError::Init(e.to_string()))?;
            rows.push(*scaled.values());
        }

        if rows.len() < loaded {
            tracing::warn!(
                "Dropped {} background rows outside domain bounds",
                loaded - rows.len()
            );
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let background: Vec<[f64; FEATURE_COUNT]> = if rows.len() > config.background_sample_size {
            rows.choose_multiple(&mut rng, config.background_sample_size)
                .copied()
                .collect()
        } else {
            rows
        };

        if background.is_empty() {
            return Err(ExplainError::Init(format!(
                "background dataset from {} has no usable rows",
                source.describe()
            )));
        }

        let permutations = (0..config.permutations)
            .map(|_| {
                let mut perm: [usize; FEATURE_COUNT] = std::array::from_fn(|i| i);
                perm.shuffle(&mut rng);
                perm
            })
            .collect();

        let mut expected = vec![0.0; model.labels().len()];
        for row in &background {
            for (e, p) in expected.iter_mut().zip(model.probabilities(row)) {
                *e += p;
            }
        }
        let n = background.len() as f64;
        expected.iter_mut().for_each(|e| *e /= n);

        Ok(Self {
            background,
            permutations,
            expected,
        })
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    pub fn permutation_count(&self) -> usize {
        self.permutations.len()
    }

    /// Expected probability of a label over the background
    pub fn expected(&self, class: usize) -> Option<f64> {
        self.expected.get(class).copied()
    }

    /// Attribution of `model`'s probability for `class` at `vector`
    pub fn attribute(
        &self,
        model: &RandomForest,
        vector: &ScaledVector,
        class: usize,
    ) -> Result<AttributionSet, ExplainError> {
        let label = model
            .labels()
            .get(class)
            .ok_or_else(|| ExplainError::Attribution(format!("class index {} out of range", class)))?;

        let values = shapley_values(
            vector.values(),
            &self.background[..],
            &self.permutations[..],
            |z| model.class_probability(z, class),
        );

        let set = AttributionSet {
            label: label.clone(),
            base_value: values.base_value,
            prediction: values.prediction,
            contributions: values.contributions,
        };

        if !set.is_finite() {
            return Err(ExplainError::Attribution(format!(
                "non-finite attribution for '{}'",
                label
            )));
        }

        Ok(set)
    }
}
