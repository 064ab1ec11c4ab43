//! Raw observations and the background reference dataset
//!
//! `RawObservation` is the per-request payload. The background dataset is a
//! fixed sample of historical observations read once, when the explainer
//! engine is first built, through a `BackgroundSource`.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FieldViolation, ValidationErrors};

/// Seven soil-chemistry and climate measurements for one field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Nitrogen (kg/ha)
    #[serde(rename = "N")]
    pub n: f64,
    /// Phosphorus (kg/ha)
    #[serde(rename = "P")]
    pub p: f64,
    /// Potassium (kg/ha)
    #[serde(rename = "K")]
    pub k: f64,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Soil pH
    pub ph: f64,
    /// Rainfall (mm)
    pub rainfall: f64,
}

/// Inclusive domain bounds, in `RawObservation::values` order
pub const FIELD_BOUNDS: [(&str, f64, f64); 7] = [
    ("N", 0.0, 140.0),
    ("P", 0.0, 145.0),
    ("K", 0.0, 205.0),
    ("temperature", 0.0, 50.0),
    ("humidity", 0.0, 100.0),
    ("ph", 0.0, 14.0),
    ("rainfall", 0.0, 500.0),
];

impl RawObservation {
    pub fn new(
        n: f64,
        p: f64,
        k: f64,
        temperature: f64,
        humidity: f64,
        ph: f64,
        rainfall: f64,
    ) -> Self {
        Self { n, p, k, temperature, humidity, ph, rainfall }
    }

    /// Field values in `FIELD_BOUNDS` order
    pub fn values(&self) -> [f64; 7] {
        [
            self.n,
            self.p,
            self.k,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }

    /// Check every field against its domain bounds
    ///
    /// Collects all violations instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let violations: Vec<FieldViolation> = FIELD_BOUNDS
            .iter()
            .zip(self.values())
            .filter_map(|(&(field, min, max), value)| {
                let message = if !value.is_finite() {
                    "must be a finite number".to_string()
                } else if value < min || value > max {
                    format!("must be between {} and {} (got {})", min, max, value)
                } else {
                    return None;
                };
                Some(FieldViolation {
                    field: field.to_string(),
                    message,
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { violations })
        }
    }
}

/// Provider of the explainer's background reference rows
///
/// Called at most once per process, during explainer initialization.
pub trait BackgroundSource: Send + Sync {
    fn load(&self) -> Result<Vec<RawObservation>>;

    /// Short description for log lines
    fn describe(&self) -> String;
}

/// Background rows held in memory
#[derive(Debug, Clone)]
pub struct InMemoryBackground {
    rows: Vec<RawObservation>,
}

impl InMemoryBackground {
    pub fn new(rows: Vec<RawObservation>) -> Self {
        Self { rows }
    }
}

impl BackgroundSource for InMemoryBackground {
    fn load(&self) -> Result<Vec<RawObservation>> {
        Ok(self.rows.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} rows)", self.rows.len())
    }
}

/// Background rows read from the historical crop CSV
///
/// Needs the seven raw columns (`N,P,K,temperature,humidity,ph,rainfall`);
/// any other column, such as `label`, is ignored. Rows with a missing value
/// are skipped.
#[derive(Debug, Clone)]
pub struct CsvBackground {
    path: PathBuf,
}

impl CsvBackground {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BackgroundSource for CsvBackground {
    fn load(&self) -> Result<Vec<RawObservation>> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(self.path.clone()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", self.path))?
            .finish()
            .with_context(|| format!("Failed to load background CSV: {:?}", self.path))?;

        let mut columns: Vec<Vec<Option<f64>>> = Vec::with_capacity(FIELD_BOUNDS.len());
        for (name, _, _) in FIELD_BOUNDS {
            let casted = df
                .column(name)
                .with_context(|| format!("Column '{}' not found", name))?
                .cast(&DataType::Float64)
                .with_context(|| format!("Column '{}' is not numeric", name))?;
            let values = casted
                .f64()
                .with_context(|| format!("Column '{}' is not Float64", name))?;
            columns.push(values.into_iter().collect());
        }

        let mut rows = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        for idx in 0..df.height() {
            let fields: Option<Vec<f64>> = columns.iter().map(|c| c[idx]).collect();
            match fields.as_deref() {
                Some(&[n, p, k, temperature, humidity, ph, rainfall]) => {
                    rows.push(RawObservation::new(n, p, k, temperature, humidity, ph, rainfall));
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} background rows with missing values", skipped);
        }

        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("csv ({})", self.path.display())
    }
}
