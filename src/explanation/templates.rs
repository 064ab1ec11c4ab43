//! Reason templates
//!
//! Every feature maps to exactly one `ReasonTemplate` through an exhaustive
//! match, so a new `Feature` variant does not compile until it has wording.
//! The phrase is picked by where the feature sits relative to the training
//! mean (sign of the scaled value); the verb by the sign of its contribution.

use crate::features::Feature;

/// Phrase pair for a feature above / below its training mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonTemplate {
    pub high: &'static str,
    pub low: &'static str,
}

pub fn template(feature: Feature) -> ReasonTemplate {
    let (high, low) = match feature {
        Feature::Nitrogen => ("nitrogen-rich soil", "nitrogen-poor soil"),
        Feature::Phosphorus => ("high phosphorus levels", "low phosphorus levels"),
        Feature::Potassium => ("high potassium availability", "low potassium availability"),
        Feature::Temperature => ("warm temperatures", "cool temperatures"),
        Feature::Humidity => ("humid air", "dry air"),
        Feature::Ph => ("alkaline-leaning soil pH", "acid-leaning soil pH"),
        Feature::Rainfall => ("high rainfall", "low rainfall"),
        Feature::NitrogenPhosphorusRatio => ("a nitrogen-heavy N:P ratio", "a phosphorus-heavy N:P ratio"),
        Feature::NitrogenPotassiumRatio => ("a nitrogen-heavy N:K ratio", "a potassium-heavy N:K ratio"),
        Feature::PhosphorusPotassiumRatio => ("a phosphorus-heavy P:K ratio", "a potassium-heavy P:K ratio"),
        Feature::NutrientBalance => ("an unbalanced N:P:K profile", "a well-balanced N:P:K profile"),
        Feature::WaterStressIndex => ("high water stress", "low water stress"),
        Feature::GrowingDegreeDays => ("strong heat accumulation", "limited heat accumulation"),
        Feature::TempHumidityIndex => ("a high heat-humidity load", "a low heat-humidity load"),
        Feature::PhOptimality => ("near-optimal soil pH", "soil pH far from optimal"),
    };
    ReasonTemplate { high, low }
}

fn capitalize(phrase: &str) -> String {
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render one reason sentence, e.g. "High rainfall favors rice"
pub fn render(feature: Feature, scaled_value: f64, contribution: f64, crop: &str) -> String {
    let t = template(feature);
    let phrase = if scaled_value >= 0.0 { t.high } else { t.low };
    let verb = if contribution >= 0.0 { "favors" } else { "disfavors" };
    format!("{} {} {}", capitalize(phrase), verb, crop)
}
