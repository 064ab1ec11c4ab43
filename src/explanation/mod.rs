//! Per-prediction explanations
//!
//! Shapley-style attribution of the predicted label's probability to the 15
//! engineered features, rendered into at most three reason sentences.

pub mod attribution;
pub mod engine;
pub mod explainer;
pub mod templates;
pub mod types;

pub use attribution::{shapley_values, ShapleyValues};
pub use engine::ExplainerEngine;
pub use explainer::Explainer;
pub use templates::{render, template, ReasonTemplate};
pub use types::*;
