//! Simulation configuration.
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{GeneratorError, Result};
use crate::score::ScoreWeights;

/// How the exhaustive simulation draws its seeds
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Exclude the previous seed's most frequent letters, then do a weighted-vowel draw
    #[default]
    RandomAlphabet,
    /// Merge the letters of globally rare words
    RareWordMerge,
}
impl SeedPolicy {
    pub fn id(self) -> u8 {
        match self {
            SeedPolicy::RandomAlphabet => 0,
            SeedPolicy::RareWordMerge => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SeedPolicy::RandomAlphabet => "random_alphabet",
            SeedPolicy::RareWordMerge => "rare_word_merge",
        }
    }
}

impl FromStr for SeedPolicy {
    type Err = GeneratorError;

    /// Accepts either the numeric id or the name
    fn from_str(s: &str) -> Result<SeedPolicy> {
        match s.trim().to_lowercase().as_str() {
            "0" | "random_alphabet" => Ok(SeedPolicy::RandomAlphabet),
            "1" | "rare_word_merge" => Ok(SeedPolicy::RareWordMerge),
            _ => Err(GeneratorError::UnknownSeedPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for SeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn check_share(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GeneratorError::InvalidConfig(format!("{} must be within [0, 1], got {}", name, value)));
    }
    Ok(())
}

fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(GeneratorError::InvalidConfig(format!("{} must be at least 1", name)));
    }
    Ok(())
}

/// Settings of the exhaustive-best simulation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExhaustiveConfig {
    pub max_letter_set_size: usize,
    pub max_attempts: usize,
    pub min_word_length: usize,
    pub min_layout_word_count: usize,
    /// Candidates whose overlap with the previous full word set reaches this are rejected
    pub overlap_reject_threshold: f64,
    pub exclude_min: usize,
    pub exclude_max: usize,
    pub seed_policy: SeedPolicy,
    pub weights: ScoreWeights,
}
impl Default for ExhaustiveConfig {
    fn default() -> Self {
        ExhaustiveConfig {
            max_letter_set_size: 9,
            max_attempts: 100,
            min_word_length: 4,
            min_layout_word_count: 9,
            overlap_reject_threshold: 0.10,
            exclude_min: 1,
            exclude_max: 3,
            seed_policy: SeedPolicy::RandomAlphabet,
            weights: ScoreWeights::default(),
        }
    }
}
impl ExhaustiveConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("max_attempts", self.max_attempts)?;
        check_positive("min_word_length", self.min_word_length)?;
        check_share("overlap_reject_threshold", self.overlap_reject_threshold)?;
        if self.exclude_min > self.exclude_max {
            return Err(GeneratorError::InvalidConfig(format!(
                "exclude_min ({}) is greater than exclude_max ({})",
                self.exclude_min, self.exclude_max
            )));
        }
        Ok(())
    }
}

/// Settings of the first-success/mutate simulation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutateConfig {
    pub max_letter_set_size: usize,
    pub max_attempts: usize,
    pub min_word_length: usize,
    /// Minimum size of both the full word set and the layout word set
    pub min_layout_word_count: usize,
    pub max_swap_cycles: usize,
    /// Share of the dictionary forming the first run's repeat-control set
    pub top_frequent_share: f64,
    pub max_repeat_share: f64,
}
impl Default for MutateConfig {
    fn default() -> Self {
        MutateConfig {
            max_letter_set_size: 9,
            max_attempts: 100,
            min_word_length: 4,
            min_layout_word_count: 9,
            max_swap_cycles: 5,
            top_frequent_share: 0.10,
            max_repeat_share: 0.40,
        }
    }
}
impl MutateConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("max_attempts", self.max_attempts)?;
        check_positive("min_word_length", self.min_word_length)?;
        check_positive("max_swap_cycles", self.max_swap_cycles)?;
        check_share("top_frequent_share", self.top_frequent_share)?;
        check_share("max_repeat_share", self.max_repeat_share)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_policy_parses_ids_and_names() {
        assert_eq!("0".parse::<SeedPolicy>().unwrap(), SeedPolicy::RandomAlphabet);
        assert_eq!("rare_word_merge".parse::<SeedPolicy>().unwrap(), SeedPolicy::RareWordMerge);
        assert_eq!(" 1 ".parse::<SeedPolicy>().unwrap(), SeedPolicy::RareWordMerge);
        assert!(matches!("2".parse::<SeedPolicy>(), Err(GeneratorError::UnknownSeedPolicy(_))));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ExhaustiveConfig::default().validate().is_ok());
        assert!(MutateConfig::default().validate().is_ok());
    }

    #[test]
    fn impossible_values_are_rejected() {
        let config = ExhaustiveConfig { exclude_min: 4, exclude_max: 3, ..Default::default() };
        assert!(matches!(config.validate(), Err(GeneratorError::InvalidConfig(_))));
        let config = ExhaustiveConfig { overlap_reject_threshold: 1.5, ..Default::default() };
        assert!(config.validate().is_err());
        let config = MutateConfig { max_attempts: 0, ..Default::default() };
        assert!(config.validate().is_err());
        let config = MutateConfig { max_repeat_share: -0.1, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
