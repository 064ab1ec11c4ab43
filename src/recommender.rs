//! Crop Recommender - pipeline coordinator
//!
//! Owns the startup-loaded artifacts (classifier and scaler statistics, both
//! `Arc`-shared and read-only) and the lazily built explainer. Each request
//! runs validate → engineer → scale → predict → rank → explain.
//!
//! Explanation problems never fail a request: the prediction is returned
//! with `reasons = []` and `explanation_degraded = true`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{ExplainerConfig, RecommenderConfig};
use crate::data::{BackgroundSource, CsvBackground, RawObservation};
use crate::error::{RecommendError, StartupError};
use crate::explanation::{Explainer, ExplainerState};
use crate::features::engineer;
use crate::model::RandomForest;
use crate::ranking::{rank, Alternative, SuitabilityTier};
use crate::utils::{scale, ScalingStatistics};

/// Response for one recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub crop: String,
    /// Top probability as an integer percentage
    pub confidence: u8,
    pub suitability_tier: SuitabilityTier,
    pub alternatives: Vec<Alternative>,
    pub reasons: Vec<String>,
    pub explanation_degraded: bool,
    pub correlation_id: Option<String>,
}

/// Health summary for supervisors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub explainer: ExplainerState,
    pub artifact_version: Option<String>,
    /// Startup failure, when the recommender could not be built
    pub error: Option<String>,
}

impl ReadinessReport {
    /// Report for a recommender that failed to start
    ///
    /// The model loads first, so a model failure means neither artifact is
    /// usable. Skewed artifacts count the scaler as not loaded.
    pub fn from_startup_error(err: &StartupError) -> Self {
        let (model_loaded, scaler_loaded) = match err {
            StartupError::ModelUnavailable(_) => (false, false),
            StartupError::ScalerUnavailable(_) | StartupError::Configuration(_) => (true, false),
        };

        Self {
            model_loaded,
            scaler_loaded,
            explainer: ExplainerState::Uninitialized,
            artifact_version: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model_loaded && self.scaler_loaded && self.error.is_none()
    }
}

pub struct CropRecommender {
    model: Arc<RandomForest>,
    stats: Arc<ScalingStatistics>,
    explainer: Explainer,
}

impl CropRecommender {
    /// Load artifacts from the configured paths
    ///
    /// Fails fast: a missing or corrupt artifact is `ModelUnavailable` or
    /// `ScalerUnavailable`, a scaler that does not match the model is
    /// `Configuration`.
    pub fn new(config: &RecommenderConfig) -> Result<Self, StartupError> {
        tracing::info!("Loading classifier: {:?}", config.model_path);
        let model = RandomForest::load(&config.model_path)?;
        tracing::info!(
            "Loaded forest with {} trees over {} labels (artifact {})",
            model.n_trees(),
            model.labels().len(),
            model.artifact_version
        );

        tracing::info!("Loading scaler: {:?}", config.scaler_path);
        let stats = ScalingStatistics::load(&config.scaler_path)
            .map_err(|e| StartupError::ScalerUnavailable(format!("{:#}", e)))?;

        let source: Arc<dyn BackgroundSource> =
            Arc::new(CsvBackground::new(config.background_path.clone()));

        Self::with_parts(model, stats, source, config.explainer.clone())
    }

    /// Assemble from already loaded parts
    pub fn with_parts(
        model: RandomForest,
        stats: ScalingStatistics,
        source: Arc<dyn BackgroundSource>,
        explainer_config: ExplainerConfig,
    ) -> Result<Self, StartupError> {
        stats.check_compatible()?;

        if stats.artifact_version != model.artifact_version {
            return Err(StartupError::Configuration(format!(
                "scaler artifact version '{}' does not match model version '{}'",
                stats.artifact_version, model.artifact_version
            )));
        }

        let model = Arc::new(model);
        let stats = Arc::new(stats);
        let eager = explainer_config.enabled && explainer_config.eager;
        let explainer = Explainer::new(model.clone(), stats.clone(), source, explainer_config);

        if eager {
            // Failure leaves the explainer Degraded; predictions still serve
            if explainer.warm_up().is_ok() {
                tracing::info!("Explainer initialized eagerly");
            }
        }

        Ok(Self {
            model,
            stats,
            explainer,
        })
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Run the full pipeline for one observation
    pub fn recommend(
        &self,
        raw: &RawObservation,
        correlation_id: Option<String>,
    ) -> Result<PredictionResult, RecommendError> {
        raw.validate()?;

        let vector = scale(&engineer(raw), &self.stats)?;
        let dist = self.model.predict(&vector);
        let ranked = rank(&dist)?;

        tracing::debug!(
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            "Predicted {} ({:.3})",
            ranked.crop,
            ranked.probability
        );

        let (reasons, explanation_degraded) = match self.explainer.explain(&vector, &ranked.crop) {
            Ok(explanation) => (explanation.texts(), false),
            Err(e) => {
                tracing::warn!(
                    correlation_id = correlation_id.as_deref().unwrap_or("-"),
                    "Explanation degraded: {}",
                    e
                );
                (Vec::new(), true)
            }
        };

        Ok(PredictionResult {
            crop: ranked.crop,
            confidence: ranked.confidence,
            suitability_tier: ranked.suitability_tier,
            alternatives: ranked.alternatives.into_vec(),
            reasons,
            explanation_degraded,
            correlation_id,
        })
    }

    pub fn readiness(&self) -> ReadinessReport {
        ReadinessReport {
            model_loaded: true,
            scaler_loaded: true,
            explainer: self.explainer.state(),
            artifact_version: Some(self.model.artifact_version.clone()),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryBackground;
    use crate::features::Feature;
    use crate::model::DecisionTree;

    fn parts(version: &str) -> (RandomForest, ScalingStatistics, Arc<dyn BackgroundSource>) {
        let forest = RandomForest::from_parts(
            version,
            vec!["maize".to_string(), "rice".to_string()],
            vec![DecisionTree::stump(
                Feature::Rainfall.index(),
                150.0,
                vec![0.7, 0.3],
                vec![0.1, 0.9],
            )],
        )
        .unwrap();
        let source: Arc<dyn BackgroundSource> = Arc::new(InMemoryBackground::new(vec![
            RawObservation::new(60.0, 40.0, 30.0, 24.0, 60.0, 6.2, 80.0),
            RawObservation::new(70.0, 45.0, 35.0, 26.0, 65.0, 6.8, 120.0),
        ]));
        (forest, ScalingStatistics::identity(version), source)
    }

    #[test]
    fn test_recommend_rice() {
        let (model, stats, source) = parts("v1");
        let rec = CropRecommender::with_parts(model, stats, source, ExplainerConfig::default()).unwrap();

        let obs = RawObservation::new(90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9);
        let result = rec.recommend(&obs, Some("req-1".to_string())).unwrap();

        assert_eq!(result.crop, "rice");
        assert_eq!(result.confidence, 90);
        assert_eq!(result.suitability_tier, SuitabilityTier::High);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].crop, "maize");
        assert_eq!(result.reasons, vec!["High rainfall favors rice".to_string()]);
        assert!(!result.explanation_degraded);
        assert_eq!(result.correlation_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn test_version_mismatch_is_configuration_error() {
        let (model, _, source) = parts("v1");
        let err = CropRecommender::with_parts(
            model,
            ScalingStatistics::identity("v2"),
            source,
            ExplainerConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, StartupError::Configuration(_)));
    }

    #[test]
    fn test_eager_config_initializes_at_startup() {
        let (model, stats, source) = parts("v1");
        let config = ExplainerConfig {
            eager: true,
            ..ExplainerConfig::default()
        };
        let rec = CropRecommender::with_parts(model, stats, source, config).unwrap();
        assert_eq!(rec.readiness().explainer, ExplainerState::Ready);
        assert_eq!(rec.explainer().initialization_count(), 1);
    }

    #[test]
    fn test_missing_scaler_reports_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let (model, _, _) = parts("v1");
        std::fs::write(&model_path, serde_json::to_string(&model).unwrap()).unwrap();

        let config = RecommenderConfig {
            model_path,
            scaler_path: dir.path().join("missing_scaler.json"),
            ..RecommenderConfig::default()
        };
        let err = CropRecommender::new(&config).err().unwrap();
        assert!(matches!(err, StartupError::ScalerUnavailable(_)));

        let report = ReadinessReport::from_startup_error(&err);
        assert!(report.model_loaded);
        assert!(!report.scaler_loaded);
        assert!(!report.is_ready());
        assert_eq!(report.explainer, ExplainerState::Uninitialized);
        assert!(report.error.unwrap().contains("scaler"));
    }

    #[test]
    fn test_missing_model_file_is_unavailable() {
        let config = RecommenderConfig {
            model_path: "does/not/exist.json".into(),
            ..RecommenderConfig::default()
        };
        let err = CropRecommender::new(&config).err().unwrap();
        assert!(matches!(err, StartupError::ModelUnavailable(_)));

        let report = ReadinessReport::from_startup_error(&err);
        assert!(!report.model_loaded && !report.scaler_loaded);
    }
}
