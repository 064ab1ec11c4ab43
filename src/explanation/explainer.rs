//! Lazily initialized explainer
//!
//! The engine is built at most once per process, on the first request that
//! needs it (or during startup when `eager` is set). Concurrent first callers
//! block on the same initialization instead of racing to build their own.
//! A failed build is remembered: the explainer stays `Degraded` and every
//! later call gets the same error without retrying.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use super::engine::ExplainerEngine;
use super::templates::render;
use super::types::{AttributionSet, ExplainerState, Explanation, Reason, MAX_REASONS};
use crate::config::ExplainerConfig;
use crate::data::BackgroundSource;
use crate::error::ExplainError;
use crate::model::RandomForest;
use crate::utils::{ScaledVector, ScalingStatistics};

pub struct Explainer {
    model: Arc<RandomForest>,
    stats: Arc<ScalingStatistics>,
    source: Arc<dyn BackgroundSource>,
    config: ExplainerConfig,
    state: AtomicU8,
    engine: OnceLock<Result<ExplainerEngine, ExplainError>>,
    init_attempts: AtomicUsize,
}

impl Explainer {
    pub fn new(
        model: Arc<RandomForest>,
        stats: Arc<ScalingStatistics>,
        source: Arc<dyn BackgroundSource>,
        config: ExplainerConfig,
    ) -> Self {
        let state = if config.enabled {
            ExplainerState::Uninitialized
        } else {
            ExplainerState::Disabled
        };

        Self {
            model,
            stats,
            source,
            config,
            state: AtomicU8::new(state.as_u8()),
            engine: OnceLock::new(),
            init_attempts: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> ExplainerState {
        ExplainerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of times the engine build has run (0 or 1)
    pub fn initialization_count(&self) -> usize {
        self.init_attempts.load(Ordering::Acquire)
    }

    /// Build the engine now instead of on first use
    pub fn warm_up(&self) -> Result<(), ExplainError> {
        self.engine().map(|_| ())
    }

    fn engine(&self) -> Result<&ExplainerEngine, ExplainError> {
        if !self.config.enabled {
            return Err(ExplainError::Disabled);
        }

        self.engine
            .get_or_init(|| self.initialize())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn initialize(&self) -> Result<ExplainerEngine, ExplainError> {
        self.state
            .store(ExplainerState::Initializing.as_u8(), Ordering::Release);
        self.init_attempts.fetch_add(1, Ordering::AcqRel);

        tracing::info!(
            "Initializing explainer from {} (sample size {}, {} permutations)",
            self.source.describe(),
            self.config.background_sample_size,
            self.config.permutations
        );
        let start = Instant::now();

        // A panicking source must still resolve the OnceLock, or the next
        // caller would run initialization again
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            ExplainerEngine::build(self.source.as_ref(), &self.model, &self.stats, &self.config)
        }))
        .unwrap_or_else(|_| Err(ExplainError::Init("initialization panicked".to_string())));

        match &result {
            Ok(engine) => {
                tracing::info!(
                    "Explainer ready: {} background rows in {:?}",
                    engine.background_len(),
                    start.elapsed()
                );
                self.state.store(ExplainerState::Ready.as_u8(), Ordering::Release);
            }
            Err(e) => {
                tracing::error!("Explainer unavailable, serving predictions without reasons: {}", e);
                self.state
                    .store(ExplainerState::Degraded.as_u8(), Ordering::Release);
            }
        }

        result
    }

    /// Raw contributions toward `label` for one scaled vector
    pub fn attribution(
        &self,
        vector: &ScaledVector,
        label: &str,
    ) -> Result<AttributionSet, ExplainError> {
        let engine = self.engine()?;
        let class = self
            .model
            .label_index(label)
            .ok_or_else(|| ExplainError::Attribution(format!("unknown label '{}'", label)))?;

        engine.attribute(&self.model, vector, class)
    }

    /// Top reasons for `label`, rendered as sentences
    pub fn explain(&self, vector: &ScaledVector, label: &str) -> Result<Explanation, ExplainError> {
        let set = self.attribution(vector, label)?;

        let reasons = set
            .top(MAX_REASONS)
            .into_iter()
            .map(|(feature, contribution)| Reason {
                feature,
                contribution,
                text: render(feature, vector.values()[feature.index()], contribution, label),
            })
            .collect();

        Ok(Explanation {
            label: label.to_string(),
            reasons,
        })
    }
}
