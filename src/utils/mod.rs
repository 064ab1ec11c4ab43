//! Utility modules shared across the pipeline
//!
//! - Normalization: feature standardization with artifact-fitted statistics

pub mod normalization;

// Re-export commonly used types
pub use normalization::{scale, ScaledVector, ScalingStatistics};
