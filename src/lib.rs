//! Crop Advisor
//!
//! Crop recommendation with per-prediction explanations.
//!
//! Pipeline: Feature Engineer → Scaler → Classifier → Ranker, with the
//! Explainer run on the same scaled vector for the chosen crop:
//! - `features`: deterministic engineered feature vector (15 features)
//! - `utils/`: standardization with the fitted scaler statistics
//! - `model/`: random forest classifier loaded from a JSON artifact
//! - `ranking`: top crop, confidence, suitability tier, alternatives
//! - `explanation/`: lazily initialized Shapley-style attribution and reasons
//! - `recommender`: the coordinator that ties it all together

pub mod config;
pub mod data;
pub mod error;
pub mod explanation;
pub mod features;
pub mod logging;
pub mod model;
pub mod ranking;
pub mod recommender;
pub mod utils;

// Re-export commonly used types
pub use config::{ExplainerConfig, RecommenderConfig};
pub use data::{BackgroundSource, CsvBackground, InMemoryBackground, RawObservation};
pub use error::{ExplainError, FieldViolation, RankError, RecommendError, StartupError, ValidationErrors};
pub use explanation::{Explainer, ExplainerState, Explanation};
pub use features::{engineer, EngineeredFeatureVector, Feature, FEATURE_COUNT};
pub use model::{ProbabilityDistribution, RandomForest};
pub use ranking::{rank, Alternative, RankedPrediction, SuitabilityTier};
pub use recommender::{CropRecommender, PredictionResult, ReadinessReport};
pub use utils::{scale, ScaledVector, ScalingStatistics};
