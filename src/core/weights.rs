use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MatchError;
use crate::models::WeightConfig;
use crate::services::MatchStore;

/// Target sum of a usable weight config
pub const WEIGHT_TOTAL: f64 = 100.0;

/// Allowed distance between the weight sum and [`WEIGHT_TOTAL`]
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.1;

// Absorbs binary representation error, e.g. 99.9 summing to 99.89999999999999
const FLOAT_SLACK: f64 = 1e-9;

/// True iff the weights sum to 100 within the tolerance
#[inline]
pub fn is_valid_sum(weights: &WeightConfig) -> bool {
    (weights.sum() - WEIGHT_TOTAL).abs() <= WEIGHT_SUM_TOLERANCE + FLOAT_SLACK
}

/// Check that a weight config may be used for scoring
pub fn validate(weights: &WeightConfig) -> Result<(), MatchError> {
    if let Some(bad) = weights.as_array().iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(MatchError::validation(format!(
            "weights must be non-negative numbers, got {}",
            bad
        )));
    }
    if !is_valid_sum(weights) {
        return Err(MatchError::validation(format!(
            "weights sum to {:.2}, expected {}",
            weights.sum(),
            WEIGHT_TOTAL
        )));
    }
    Ok(())
}

#[inline]
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fixed catalog of weight presets. Every preset sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Default,
    LocationPriority,
    SkillsPriority,
    AvailabilityPriority,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Default,
        Preset::LocationPriority,
        Preset::SkillsPriority,
        Preset::AvailabilityPriority,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Default => "Default",
            Preset::LocationPriority => "LocationPriority",
            Preset::SkillsPriority => "SkillsPriority",
            Preset::AvailabilityPriority => "AvailabilityPriority",
        }
    }

    pub fn weights(&self) -> WeightConfig {
        let (location, interests, background, availability, frequency, timing) = match self {
            Preset::Default => (40.0, 25.0, 25.0, 5.0, 2.5, 2.5),
            Preset::LocationPriority => (60.0, 20.0, 15.0, 3.0, 1.0, 1.0),
            Preset::SkillsPriority => (20.0, 35.0, 35.0, 5.0, 2.5, 2.5),
            Preset::AvailabilityPriority => (25.0, 15.0, 15.0, 25.0, 10.0, 10.0),
        };
        WeightConfig {
            location,
            interests,
            background,
            availability,
            frequency,
            timing,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = MatchError;

    /// Accepts `LocationPriority`, `location_priority`, `location-priority`
    /// and other case/separator variants
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().to_lowercase() == key)
            .ok_or_else(|| MatchError::validation(format!("unknown weight preset '{}'", s)))
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Preset::Default.weights()
    }
}

/// Editing session over the scoring weights.
///
/// Edits may leave the weights transiently invalid; only [`save`] enforces
/// the sum invariant.
///
/// [`save`]: WeightConfiguration::save
#[derive(Debug, Clone, PartialEq)]
pub struct WeightConfiguration {
    weights: WeightConfig,
    dirty: bool,
}

impl WeightConfiguration {
    pub fn new(weights: WeightConfig) -> Self {
        Self {
            weights,
            dirty: false,
        }
    }

    /// Start from the persisted config, or the default preset when none is
    /// stored yet
    pub async fn load(store: &dyn MatchStore) -> Result<Self, MatchError> {
        let weights = store.get_weight_config().await?.unwrap_or_default();
        Ok(Self::new(weights))
    }

    pub fn weights(&self) -> WeightConfig {
        self.weights
    }

    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }

    pub fn is_valid(&self) -> bool {
        is_valid_sum(&self.weights)
    }

    /// Whether there are edits not yet saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace all six weights. Any sum is accepted; negative or non-finite
    /// values are not.
    pub fn set_weights(&mut self, new_weights: WeightConfig) -> Result<(), MatchError> {
        if let Some(bad) = new_weights.as_array().iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(MatchError::validation(format!(
                "weights must be non-negative numbers, got {}",
                bad
            )));
        }

        self.weights = new_weights;
        self.dirty = true;

        if !self.is_valid() {
            tracing::debug!("Weights set with sum {:.2}; not valid until balanced", self.sum());
        }
        Ok(())
    }

    /// Scale every weight by `100 / sum`, rounding each to one decimal place.
    /// Leaves the weights untouched when they sum to zero.
    pub fn auto_balance(&mut self) -> Result<(), MatchError> {
        let current_sum = self.sum();
        if current_sum <= 0.0 {
            return Err(MatchError::validation("cannot balance weights that sum to zero"));
        }

        let factor = WEIGHT_TOTAL / current_sum;
        self.weights = self.weights.map(|w| round_to_tenth(w * factor));
        self.dirty = true;

        tracing::debug!("Auto-balanced weights from {:.2} to {:.2}", current_sum, self.sum());
        Ok(())
    }

    /// Replace the whole weight set with a named preset
    pub fn apply_preset(&mut self, name: &str) -> Result<Preset, MatchError> {
        let preset: Preset = name.parse()?;
        self.weights = preset.weights();
        self.dirty = true;
        Ok(preset)
    }

    /// Persist the weights if they are valid. On rejection nothing is written.
    pub async fn save(&mut self, store: &dyn MatchStore) -> Result<(), MatchError> {
        validate(&self.weights)?;

        store.save_weight_config(&self.weights).await?;
        self.dirty = false;

        tracing::info!("Saved weight config: {:?}", self.weights);
        Ok(())
    }
}

impl Default for WeightConfiguration {
    fn default() -> Self {
        Self::new(WeightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryStore;

    fn weights(values: [f64; 6]) -> WeightConfig {
        WeightConfig {
            location: values[0],
            interests: values[1],
            background: values[2],
            availability: values[3],
            frequency: values[4],
            timing: values[5],
        }
    }

    #[test]
    fn test_presets_sum_to_100() {
        for preset in Preset::ALL {
            assert!(is_valid_sum(&preset.weights()), "{} must sum to 100", preset);
        }
    }

    #[test]
    fn test_location_priority_preset() {
        let mut config = WeightConfiguration::default();
        let preset = config.apply_preset("LocationPriority").unwrap();

        assert_eq!(preset, Preset::LocationPriority);
        assert_eq!(config.weights(), weights([60.0, 20.0, 15.0, 3.0, 1.0, 1.0]));
        assert_eq!(config.sum(), 100.0);
    }

    #[test]
    fn test_preset_name_variants() {
        assert_eq!("location_priority".parse::<Preset>().unwrap(), Preset::LocationPriority);
        assert_eq!("skills-priority".parse::<Preset>().unwrap(), Preset::SkillsPriority);
        assert_eq!("DEFAULT".parse::<Preset>().unwrap(), Preset::Default);
        assert!("fastest".parse::<Preset>().is_err());
    }

    #[test]
    fn test_is_valid_tolerance() {
        let mut config = WeightConfiguration::default();

        config.set_weights(weights([40.0, 25.0, 25.0, 5.0, 2.5, 2.6])).unwrap();
        assert!(config.is_valid());

        config.set_weights(weights([40.0, 25.0, 25.0, 5.0, 2.5, 2.7])).unwrap();
        assert!(!config.is_valid());
    }

    #[test]
    fn test_set_weights_rejects_negative() {
        let mut config = WeightConfiguration::default();
        let result = config.set_weights(weights([-1.0, 25.0, 25.0, 5.0, 2.5, 2.5]));

        assert!(matches!(result, Err(MatchError::Validation(_))));
        assert_eq!(config.weights(), WeightConfig::default());
        assert!(!config.is_dirty());
    }

    #[test]
    fn test_auto_balance_scales_to_100() {
        let mut config = WeightConfiguration::default();
        config.set_weights(weights([20.0, 12.5, 12.5, 2.5, 1.25, 1.25])).unwrap();

        config.auto_balance().unwrap();

        assert_eq!(config.weights(), weights([40.0, 25.0, 25.0, 5.0, 2.5, 2.5]));
        assert!(config.is_valid());
    }

    #[test]
    fn test_auto_balance_rounds_to_one_decimal() {
        let mut config = WeightConfiguration::default();
        config.set_weights(weights([1.0, 1.0, 1.0, 0.0, 0.0, 0.0])).unwrap();

        config.auto_balance().unwrap();

        assert_eq!(config.weights().location, 33.3);
        assert!((config.sum() - 99.9).abs() < 1e-9);
        assert!(config.is_valid());
    }

    #[test]
    fn test_auto_balance_zero_sum_is_noop() {
        let mut config = WeightConfiguration::default();
        let zero = weights([0.0; 6]);
        config.set_weights(zero).unwrap();

        assert!(config.auto_balance().is_err());
        assert_eq!(config.weights(), zero);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_and_keeps_prior() {
        let store = MemoryStore::new();
        let mut config = WeightConfiguration::default();
        config.apply_preset("SkillsPriority").unwrap();
        config.save(&store).await.unwrap();

        config.set_weights(weights([50.0, 50.0, 50.0, 0.0, 0.0, 0.0])).unwrap();
        let result = config.save(&store).await;

        assert!(matches!(result, Err(MatchError::Validation(_))));
        assert!(config.is_dirty());
        assert_eq!(
            store.get_weight_config().await.unwrap(),
            Some(Preset::SkillsPriority.weights())
        );
    }

    #[tokio::test]
    async fn test_load_defaults_when_nothing_persisted() {
        let store = MemoryStore::new();
        let config = WeightConfiguration::load(&store).await.unwrap();

        assert_eq!(config.weights(), Preset::Default.weights());
        assert!(!config.is_dirty());
    }
}
