//! Feature Engineering
//!
//! Turns one `RawObservation` into the fixed-order feature vector the
//! scaler and classifier artifacts were trained on. Pure and total: the same
//! observation always yields a bit-identical vector, and boundary inputs
//! (zero nutrients, negative values that slipped past validation) map to
//! documented sentinels instead of NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::data::RawObservation;

/// Number of engineered features
pub const FEATURE_COUNT: usize = 15;

/// Value used for a ratio whose denominator is zero, negative or non-finite
pub const RATIO_SENTINEL: f64 = 0.0;

/// Upper cap on every nutrient ratio
pub const RATIO_CAP: f64 = 50.0;

/// Nutrient balance when N + P + K is zero: the largest possible distance
/// between two proportion vectors
pub const NUTRIENT_BALANCE_SENTINEL: f64 = std::f64::consts::SQRT_2;

/// Ideal N:P:K proportion (4:2:1)
const IDEAL_NPK: [f64; 3] = [4.0 / 7.0, 2.0 / 7.0, 1.0 / 7.0];

/// Base temperature for growing degree days (°C)
pub const GDD_BASE_TEMP: f64 = 18.0;

/// Days per accumulation period for growing degree days
const GDD_PERIOD_DAYS: f64 = 30.0;

/// Soil pH treated as optimal
const OPTIMAL_PH: f64 = 6.5;

/// Engineered features, in vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
    NitrogenPhosphorusRatio,
    NitrogenPotassiumRatio,
    PhosphorusPotassiumRatio,
    NutrientBalance,
    WaterStressIndex,
    GrowingDegreeDays,
    TempHumidityIndex,
    PhOptimality,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Ph,
        Feature::Rainfall,
        Feature::NitrogenPhosphorusRatio,
        Feature::NitrogenPotassiumRatio,
        Feature::PhosphorusPotassiumRatio,
        Feature::NutrientBalance,
        Feature::WaterStressIndex,
        Feature::GrowingDegreeDays,
        Feature::TempHumidityIndex,
        Feature::PhOptimality,
    ];

    /// Column name used in the trained artifacts
    pub fn name(self) -> &'static str {
        match self {
            Feature::Nitrogen => "N",
            Feature::Phosphorus => "P",
            Feature::Potassium => "K",
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::Ph => "ph",
            Feature::Rainfall => "rainfall",
            Feature::NitrogenPhosphorusRatio => "n_p_ratio",
            Feature::NitrogenPotassiumRatio => "n_k_ratio",
            Feature::PhosphorusPotassiumRatio => "p_k_ratio",
            Feature::NutrientBalance => "nutrient_balance",
            Feature::WaterStressIndex => "water_stress_index",
            Feature::GrowingDegreeDays => "growing_degree_days",
            Feature::TempHumidityIndex => "temp_humidity_index",
            Feature::PhOptimality => "ph_optimality",
        }
    }

    /// Position in the feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Feature> {
        Feature::ALL.get(index).copied()
    }
}

/// Feature names in vector order
pub fn feature_names() -> Vec<&'static str> {
    Feature::ALL.iter().map(|f| f.name()).collect()
}

/// Engineered feature vector, immutable once built
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl EngineeredFeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }
}

/// Guarded division with sentinel and cap
fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if !denominator.is_finite() || denominator <= 0.0 || !numerator.is_finite() {
        return RATIO_SENTINEL;
    }
    (numerator / denominator).clamp(-RATIO_CAP, RATIO_CAP)
}

/// Distance of the observed N:P:K proportion from the ideal 4:2:1
fn nutrient_balance(n: f64, p: f64, k: f64) -> f64 {
    let npk = [n.max(0.0), p.max(0.0), k.max(0.0)];
    let total: f64 = npk.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return NUTRIENT_BALANCE_SENTINEL;
    }

    npk.iter()
        .zip(IDEAL_NPK)
        .map(|(v, ideal)| {
            let d = v / total - ideal;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Water stress in (0, 1]: 1 means no effective water supply
fn water_stress_index(rainfall: f64, humidity: f64) -> f64 {
    let supply = rainfall.max(0.0) * humidity.clamp(0.0, 100.0) / 100.0;
    100.0 / (100.0 + supply)
}

/// Heat accumulation above the base temperature, zero below it
fn growing_degree_days(temperature: f64) -> f64 {
    (temperature - GDD_BASE_TEMP).max(0.0) * GDD_PERIOD_DAYS
}

fn temp_humidity_index(temperature: f64, humidity: f64) -> f64 {
    temperature * humidity / 100.0
}

fn ph_optimality(ph: f64) -> f64 {
    1.0 - (ph - OPTIMAL_PH).abs() / OPTIMAL_PH
}

/// Build the engineered feature vector for one observation
pub fn engineer(raw: &RawObservation) -> EngineeredFeatureVector {
    let mut values = [0.0; FEATURE_COUNT];

    values[Feature::Nitrogen.index()] = raw.n;
    values[Feature::Phosphorus.index()] = raw.p;
    values[Feature::Potassium.index()] = raw.k;
    values[Feature::Temperature.index()] = raw.temperature;
    values[Feature::Humidity.index()] = raw.humidity;
    values[Feature::Ph.index()] = raw.ph;
    values[Feature::Rainfall.index()] = raw.rainfall;

    values[Feature::NitrogenPhosphorusRatio.index()] = safe_ratio(raw.n, raw.p);
    values[Feature::NitrogenPotassiumRatio.index()] = safe_ratio(raw.n, raw.k);
    values[Feature::PhosphorusPotassiumRatio.index()] = safe_ratio(raw.p, raw.k);
    values[Feature::NutrientBalance.index()] = nutrient_balance(raw.n, raw.p, raw.k);
    values[Feature::WaterStressIndex.index()] = water_stress_index(raw.rainfall, raw.humidity);
    values[Feature::GrowingDegreeDays.index()] = growing_degree_days(raw.temperature);
    values[Feature::TempHumidityIndex.index()] = temp_humidity_index(raw.temperature, raw.humidity);
    values[Feature::PhOptimality.index()] = ph_optimality(raw.ph);

    EngineeredFeatureVector { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> RawObservation {
        RawObservation::new(90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9)
    }

    #[test]
    fn test_feature_order_is_stable() {
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(Feature::from_index(i), Some(*f));
        }
        assert_eq!(feature_names()[0], "N");
        assert_eq!(feature_names()[FEATURE_COUNT - 1], "ph_optimality");
        assert_eq!(Feature::from_index(FEATURE_COUNT), None);
    }

    #[test]
    fn test_engineer_is_bit_identical() {
        let a = engineer(&sample());
        let b = engineer(&sample());
        for (x, y) in a.values().iter().zip(b.values()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_reference_values() {
        let v = engineer(&sample());
        assert_relative_eq!(v.get(Feature::NitrogenPhosphorusRatio), 90.0 / 42.0, epsilon = 1e-12);
        assert_relative_eq!(v.get(Feature::PhosphorusPotassiumRatio), 42.0 / 43.0, epsilon = 1e-12);
        assert_relative_eq!(v.get(Feature::GrowingDegreeDays), 2.8 * 30.0, epsilon = 1e-9);
        assert_relative_eq!(v.get(Feature::TempHumidityIndex), 20.8 * 0.82, epsilon = 1e-12);
        assert_relative_eq!(v.get(Feature::PhOptimality), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            v.get(Feature::WaterStressIndex),
            100.0 / (100.0 + 202.9 * 0.82),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_potassium_uses_sentinel() {
        let v = engineer(&RawObservation { k: 0.0, ..sample() });
        assert_eq!(v.get(Feature::NitrogenPotassiumRatio), RATIO_SENTINEL);
        assert_eq!(v.get(Feature::PhosphorusPotassiumRatio), RATIO_SENTINEL);
        assert!(v.values().iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_zero_phosphorus_uses_sentinel() {
        let v = engineer(&RawObservation { p: 0.0, ..sample() });
        assert_eq!(v.get(Feature::NitrogenPhosphorusRatio), RATIO_SENTINEL);
        assert!(v.get(Feature::NitrogenPotassiumRatio) > 0.0);
    }

    #[test]
    fn test_ratio_is_capped() {
        let v = engineer(&RawObservation { n: 140.0, p: 0.5, ..sample() });
        assert_eq!(v.get(Feature::NitrogenPhosphorusRatio), RATIO_CAP);
    }

    #[test]
    fn test_no_nutrients_balance_sentinel() {
        let v = engineer(&RawObservation { n: 0.0, p: 0.0, k: 0.0, ..sample() });
        assert_eq!(v.get(Feature::NutrientBalance), NUTRIENT_BALANCE_SENTINEL);
    }

    #[test]
    fn test_ideal_npk_has_zero_balance_distance() {
        let v = engineer(&RawObservation { n: 80.0, p: 40.0, k: 20.0, ..sample() });
        assert_relative_eq!(v.get(Feature::NutrientBalance), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gdd_clamped_below_base() {
        let v = engineer(&RawObservation { temperature: 10.0, ..sample() });
        assert_eq!(v.get(Feature::GrowingDegreeDays), 0.0);
    }

    #[test]
    fn test_negative_inputs_stay_finite() {
        let raw = RawObservation::new(-5.0, -1.0, -3.0, -20.0, -10.0, -1.0, -50.0);
        let v = engineer(&raw);
        assert!(v.values().iter().all(|x| x.is_finite()));
        assert_eq!(v.get(Feature::WaterStressIndex), 1.0);
    }
}
