use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tuning knobs for span detection and sense selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisambiguationConfig {
    /// Senses below this prior probability are never considered
    pub min_prior_probability: f64,

    /// Longest n-gram, counted in boundary positions
    pub max_lookahead: usize,

    pub relatedness_weight: f64,
    pub commonness_weight: f64,

    /// Relatedness assumed when a combination has fewer than two senses
    pub default_relatedness: f64,
}

impl Default for DisambiguationConfig {
    fn default() -> Self {
        Self {
            min_prior_probability: 0.01,
            max_lookahead: 15,
            relatedness_weight: 3.0,
            commonness_weight: 1.0,
            default_relatedness: 0.5,
        }
    }
}

impl DisambiguationConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_prior_probability) {
            return Err(format!(
                "min_prior_probability must be in [0, 1], got {}",
                self.min_prior_probability
            ));
        }
        if !(0.0..=1.0).contains(&self.default_relatedness) {
            return Err(format!(
                "default_relatedness must be in [0, 1], got {}",
                self.default_relatedness
            ));
        }
        if self.max_lookahead == 0 {
            return Err("max_lookahead must be at least 1".to_string());
        }
        if self.relatedness_weight < 0.0 || self.commonness_weight < 0.0 {
            return Err("weights must not be negative".to_string());
        }
        if self.relatedness_weight + self.commonness_weight <= 0.0 {
            return Err("relatedness_weight and commonness_weight cannot both be zero".to_string());
        }
        Ok(())
    }

    /// Weighted mean of commonness and relatedness
    #[must_use]
    pub fn combine(&self, commonness: f64, relatedness: f64) -> f64 {
        (self.commonness_weight * commonness + self.relatedness_weight * relatedness)
            / (self.commonness_weight + self.relatedness_weight)
    }
}

/// Case-insensitive stopword set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.0.contains(&text.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Stopwords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
        )
    }
}
