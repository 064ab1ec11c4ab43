//! Recommender Integration Tests
//!
//! End-to-end runs of the full pipeline through `CropRecommender`, including
//! the lazy explainer lifecycle under concurrency and failure.

mod common;

use approx::assert_relative_eq;
use common::*;
use crop_advisor::features::{Feature, RATIO_SENTINEL};
use crop_advisor::model::PROBABILITY_TOLERANCE;
use crop_advisor::{
    engineer, scale, BackgroundSource, CropRecommender, ExplainerConfig, ExplainerState,
    RawObservation, RecommendError, RecommenderConfig, StartupError, SuitabilityTier,
};
use std::sync::{Arc, Barrier};
use std::thread;

fn recommender(source: Arc<dyn BackgroundSource>) -> CropRecommender {
    CropRecommender::with_parts(forest(), scaler(), source, ExplainerConfig::default())
        .expect("fixture artifacts are compatible")
}

#[test]
fn test_reference_scenario() {
    let rec = recommender(Arc::new(background()));
    let result = rec
        .recommend(&reference_observation(), Some("ref-1".to_string()))
        .unwrap();

    // rice: (0.9 + 0.7 + 0.6) / 3
    assert_eq!(result.crop, "rice");
    assert_eq!(result.confidence, 73);
    assert_eq!(result.suitability_tier, SuitabilityTier::Moderate);

    let alternatives: Vec<&str> = result.alternatives.iter().map(|a| a.crop.as_str()).collect();
    assert_eq!(alternatives, vec!["maize", "kidneybeans", "chickpea"]);
    assert!(!alternatives.contains(&result.crop.as_str()));
    for pair in result.alternatives.windows(2) {
        assert!(pair[0].probability >= pair[1].probability);
    }
    assert_relative_eq!(result.alternatives[0].probability, 0.65 / 3.0, epsilon = 1e-12);

    assert!(!result.explanation_degraded);
    assert!(!result.reasons.is_empty() && result.reasons.len() <= 3);
    assert!(result.reasons.iter().all(|r| r.ends_with("rice")));
    assert_eq!(result.correlation_id.as_deref(), Some("ref-1"));
}

#[test]
fn test_zero_potassium_uses_sentinel() {
    let rec = recommender(Arc::new(background()));
    let obs = RawObservation::new(90.0, 42.0, 0.0, 20.8, 82.0, 6.5, 202.9);

    let vector = engineer(&obs);
    assert_eq!(vector.get(Feature::NitrogenPotassiumRatio), RATIO_SENTINEL);
    assert_eq!(vector.get(Feature::PhosphorusPotassiumRatio), RATIO_SENTINEL);
    assert!(vector.values().iter().all(|v| v.is_finite()));

    let result = rec.recommend(&obs, None).unwrap();
    // N:K falls back to 0.0, so the third tree takes its left branch
    assert_eq!(result.crop, "rice");
    assert_eq!(result.confidence, 57);
    assert!(!result.explanation_degraded);
}

#[test]
fn test_forced_init_failure_degrades_reasons_only() {
    let rec = recommender(Arc::new(FailingSource));

    let first = rec.recommend(&reference_observation(), None).unwrap();
    assert_eq!(first.crop, "rice");
    assert!(first.reasons.is_empty());
    assert!(first.explanation_degraded);

    let second = rec.recommend(&reference_observation(), None).unwrap();
    assert!(second.explanation_degraded);

    assert_eq!(rec.readiness().explainer, ExplainerState::Degraded);
    assert_eq!(rec.explainer().initialization_count(), 1);
}

#[test]
fn test_panicking_init_degrades_reasons_only() {
    let rec = recommender(Arc::new(PanickingSource));

    for _ in 0..2 {
        let result = rec.recommend(&reference_observation(), None).unwrap();
        assert_eq!(result.crop, "rice");
        assert!(result.reasons.is_empty());
        assert!(result.explanation_degraded);
    }

    assert_eq!(rec.readiness().explainer, ExplainerState::Degraded);
    assert_eq!(rec.explainer().initialization_count(), 1);
}

#[test]
fn test_concurrent_cold_start_initializes_once() {
    let source = Arc::new(CountingSource::new());
    let rec = Arc::new(recommender(source.clone()));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let rec = Arc::clone(&rec);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                rec.recommend(&reference_observation(), None).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(source.loads(), 1);
    assert_eq!(rec.explainer().initialization_count(), 1);
    assert_eq!(rec.readiness().explainer, ExplainerState::Ready);
    for result in &results {
        assert!(!result.explanation_degraded);
        assert_eq!(result, &results[0]);
    }
}

#[test]
fn test_ready_explainer_is_idempotent() {
    let rec = recommender(Arc::new(background()));
    let a = rec.recommend(&reference_observation(), None).unwrap();
    let b = rec.recommend(&reference_observation(), None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_probabilities_sum_to_one() {
    let rec = recommender(Arc::new(background()));
    let stats = scaler();

    for obs in background_rows() {
        let dist = rec.model().predict(&scale(&engineer(&obs), &stats).unwrap());
        assert_eq!(dist.len(), LABELS.len());
        assert!((dist.total() - 1.0).abs() <= PROBABILITY_TOLERANCE);
        assert!(dist.entries().iter().all(|e| e.probability >= 0.0));
    }
}

#[test]
fn test_attribution_sums_to_prediction_minus_baseline() {
    let rec = recommender(Arc::new(background()));
    let vector = scale(&engineer(&reference_observation()), &scaler()).unwrap();

    let set = rec.explainer().attribution(&vector, "rice").unwrap();
    assert_relative_eq!(set.total(), set.prediction - set.base_value, epsilon = 1e-9);
}

#[test]
fn test_validation_reports_every_field() {
    let rec = recommender(Arc::new(background()));
    let obs = RawObservation::new(-1.0, 42.0, 43.0, 20.8, 120.0, f64::NAN, 202.9);

    match rec.recommend(&obs, None) {
        Err(RecommendError::Validation(errors)) => {
            assert_eq!(errors.fields(), vec!["N", "humidity", "ph"]);
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
    // Rejected input never touches the explainer
    assert_eq!(rec.explainer().initialization_count(), 0);
}

#[test]
fn test_readiness_report() {
    let rec = recommender(Arc::new(background()));

    let before = rec.readiness();
    assert!(before.model_loaded && before.scaler_loaded);
    assert_eq!(before.explainer, ExplainerState::Uninitialized);
    assert_eq!(before.artifact_version.as_deref(), Some(VERSION));
    assert!(before.error.is_none() && before.is_ready());

    rec.recommend(&reference_observation(), None).unwrap();
    assert_eq!(rec.readiness().explainer, ExplainerState::Ready);
}

#[test]
fn test_disabled_explainer() {
    let config = ExplainerConfig {
        enabled: false,
        ..ExplainerConfig::default()
    };
    let source = Arc::new(CountingSource::new());
    let rec = CropRecommender::with_parts(forest(), scaler(), source.clone(), config).unwrap();

    let result = rec.recommend(&reference_observation(), None).unwrap();
    assert_eq!(result.crop, "rice");
    assert!(result.reasons.is_empty());
    assert!(result.explanation_degraded);
    assert_eq!(rec.readiness().explainer, ExplainerState::Disabled);
    assert_eq!(source.loads(), 0);
}

#[test]
fn test_artifact_version_mismatch() {
    let mut stats = scaler();
    stats.artifact_version = "fixture-2".to_string();

    let err = CropRecommender::with_parts(
        forest(),
        stats,
        Arc::new(background()),
        ExplainerConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, StartupError::Configuration(_)));
}

#[test]
fn test_scaler_feature_order_mismatch() {
    let mut stats = scaler();
    stats.feature_names.swap(0, 1);

    let err = CropRecommender::with_parts(
        forest(),
        stats,
        Arc::new(background()),
        ExplainerConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, StartupError::Configuration(_)));
}

#[test]
fn test_load_from_artifact_files() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let scaler_path = dir.path().join("scaler.json");
    let csv_path = dir.path().join("background.csv");

    std::fs::write(&model_path, serde_json::to_string(&forest()).unwrap()).unwrap();
    std::fs::write(&scaler_path, serde_json::to_string(&scaler()).unwrap()).unwrap();

    let mut csv = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
    for row in background_rows() {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},fixture\n",
            row.n, row.p, row.k, row.temperature, row.humidity, row.ph, row.rainfall
        ));
    }
    std::fs::write(&csv_path, csv).unwrap();

    let config = RecommenderConfig {
        model_path,
        scaler_path,
        background_path: csv_path,
        explainer: ExplainerConfig {
            eager: true,
            ..ExplainerConfig::default()
        },
    };

    let rec = CropRecommender::new(&config).unwrap();
    assert_eq!(rec.readiness().explainer, ExplainerState::Ready);

    let result = rec.recommend(&reference_observation(), None).unwrap();
    assert_eq!(result.crop, "rice");
    assert!(!result.explanation_degraded);
}

#[test]
fn test_corrupt_model_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, "{ not json").unwrap();

    let config = RecommenderConfig {
        model_path,
        ..RecommenderConfig::default()
    };
    let err = CropRecommender::new(&config).err().unwrap();
    assert!(matches!(err, StartupError::ModelUnavailable(_)));
}
