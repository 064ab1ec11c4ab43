//! Shared fixtures for the integration tests
//!
//! The fixture forest works on unscaled values (identity scaler), so split
//! thresholds read in the raw units: rainfall in mm, humidity in %.

#![allow(dead_code)]

use crop_advisor::features::Feature;
use crop_advisor::model::DecisionTree;
use crop_advisor::{BackgroundSource, InMemoryBackground, RandomForest, RawObservation, ScalingStatistics};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const VERSION: &str = "fixture-1";

pub const LABELS: [&str; 4] = ["chickpea", "kidneybeans", "maize", "rice"];

/// The documented reference observation
pub fn reference_observation() -> RawObservation {
    RawObservation::new(90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9)
}

pub fn forest() -> RandomForest {
    RandomForest::from_parts(
        VERSION,
        LABELS.iter().map(|s| s.to_string()).collect(),
        vec![
            DecisionTree::stump(
                Feature::Rainfall.index(),
                150.0,
                vec![0.4, 0.2, 0.3, 0.1],
                vec![0.0, 0.0, 0.1, 0.9],
            ),
            DecisionTree::stump(
                Feature::Humidity.index(),
                50.0,
                vec![0.6, 0.3, 0.1, 0.0],
                vec![0.0, 0.05, 0.25, 0.7],
            ),
            DecisionTree::stump(
                Feature::NitrogenPotassiumRatio.index(),
                1.5,
                vec![0.1, 0.4, 0.4, 0.1],
                vec![0.05, 0.05, 0.3, 0.6],
            ),
        ],
    )
    .expect("fixture forest is valid")
}

pub fn scaler() -> ScalingStatistics {
    ScalingStatistics::identity(VERSION)
}

/// Deterministic historical rows spanning both sides of every split
pub fn background_rows() -> Vec<RawObservation> {
    (0..40)
        .map(|i| {
            let t = i as f64;
            RawObservation::new(
                20.0 + (t * 7.0) % 110.0,
                15.0 + (t * 5.0) % 90.0,
                15.0 + (t * 11.0) % 150.0,
                12.0 + (t * 3.0) % 30.0,
                20.0 + (t * 9.0) % 75.0,
                5.0 + (t * 0.3) % 3.0,
                30.0 + (t * 13.0) % 260.0,
            )
        })
        .collect()
}

pub fn background() -> InMemoryBackground {
    InMemoryBackground::new(background_rows())
}

/// Background source that counts how often it is read
pub struct CountingSource {
    inner: InMemoryBackground,
    loads: AtomicUsize,
}

impl CountingSource {
    pub fn new() -> Self {
        Self {
            inner: background(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl BackgroundSource for CountingSource {
    fn load(&self) -> anyhow::Result<Vec<RawObservation>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent callers can arrive
        std::thread::sleep(std::time::Duration::from_millis(50));
        self.inner.load()
    }

    fn describe(&self) -> String {
        "counting fixture".to_string()
    }
}

/// Background source that always fails
pub struct FailingSource;

impl BackgroundSource for FailingSource {
    fn load(&self) -> anyhow::Result<Vec<RawObservation>> {
        anyhow::bail!("background dataset is missing")
    }

    fn describe(&self) -> String {
        "failing fixture".to_string()
    }
}

/// Background source whose reader panics
pub struct PanickingSource;

impl BackgroundSource for PanickingSource {
    fn load(&self) -> anyhow::Result<Vec<RawObservation>> {
        panic!("CSV reader panicked")
    }

    fn describe(&self) -> String {
        "panicking fixture".to_string()
    }
}
