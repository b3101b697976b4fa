//! Exhaustive sense selection over every combination of candidate senses.

use serde::Serialize;
use std::collections::BTreeMap;
use wikigraph_codec::{LabelRecord, PageId};

use crate::config::DisambiguationConfig;
use crate::error::{AnnotateError, Result};
use crate::relatedness::{RelatednessCache, Scorer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateSense {
    pub page_id: PageId,
    pub prior_probability: f64,
}

/// One label of the query with its senses, most probable first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateLabel {
    pub text: String,
    pub stopword: bool,
    pub senses: Vec<CandidateSense>,
}

impl CandidateLabel {
    pub fn new(text: impl Into<String>, stopword: bool, mut senses: Vec<CandidateSense>) -> Self {
        senses.sort_by(|a, b| b.prior_probability.total_cmp(&a.prior_probability));
        Self {
            text: text.into(),
            stopword,
            senses,
        }
    }

    /// Senses in stored order, which is already most linked first
    pub fn from_record(text: impl Into<String>, label: &LabelRecord, stopword: bool) -> Self {
        Self {
            text: text.into(),
            stopword,
            senses: label
                .senses_with_prior()
                .map(|(sense, prior)| CandidateSense {
                    page_id: sense.page_id,
                    prior_probability: prior,
                })
                .collect(),
        }
    }

    /// Senses at or above the cutoff
    pub fn plausible(&self, min_prior: f64) -> impl Iterator<Item = &CandidateSense> + '_ {
        self.senses
            .iter()
            .take_while(move |sense| sense.prior_probability >= min_prior)
    }
}

/// Winning combination plus the best weight every sense reached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    /// One entry per input label; `None` for skipped labels
    pub choices: Vec<Option<CandidateSense>>,
    pub weight: f64,
    pub sense_weights: BTreeMap<PageId, f64>,
    /// Complete combinations that were weighed
    pub combinations: usize,
}

impl Resolution {
    #[must_use]
    pub fn sense_weight(&self, page_id: PageId) -> Option<f64> {
        self.sense_weights.get(&page_id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DisambiguationOutcome {
    Resolved(Resolution),
    NoPlausibleInterpretation { reason: String },
}

impl DisambiguationOutcome {
    #[must_use]
    pub fn resolution(&self) -> Option<&Resolution> {
        match self {
            Self::Resolved(resolution) => Some(resolution),
            Self::NoPlausibleInterpretation { .. } => None,
        }
    }
}

/// Running best state threaded through the recursion
#[derive(Default)]
struct Accumulator {
    best: Option<(Vec<Option<CandidateSense>>, f64)>,
    sense_weights: BTreeMap<PageId, f64>,
    combinations: usize,
}

pub struct ExhaustiveDisambiguator<'s> {
    scorer: &'s dyn Scorer,
    config: DisambiguationConfig,
}

impl<'s> ExhaustiveDisambiguator<'s> {
    pub fn new(scorer: &'s dyn Scorer, config: DisambiguationConfig) -> Result<Self> {
        config.validate().map_err(AnnotateError::Config)?;
        Ok(Self { scorer, config })
    }

    #[must_use]
    pub fn config(&self) -> &DisambiguationConfig {
        &self.config
    }

    /// Weigh every combination of plausible senses and keep the best.
    ///
    /// Stopwords and labels without a sense above the cutoff take no part.
    /// Cost is the product of per-label candidate counts.
    pub fn disambiguate(&self, labels: &[CandidateLabel]) -> Result<DisambiguationOutcome> {
        let mut cache = RelatednessCache::new(self.scorer);
        self.disambiguate_with(labels, &mut cache)
    }

    /// Same as [`disambiguate`](Self::disambiguate), sharing a caller's cache
    pub fn disambiguate_with(
        &self,
        labels: &[CandidateLabel],
        cache: &mut RelatednessCache<'_>,
    ) -> Result<DisambiguationOutcome> {
        if labels.is_empty() {
            return Ok(DisambiguationOutcome::NoPlausibleInterpretation {
                reason: "no labels".to_string(),
            });
        }
        let min_prior = self.config.min_prior_probability;
        let candidates: Vec<Vec<CandidateSense>> = labels
            .iter()
            .map(|label| {
                if label.stopword {
                    Vec::new()
                } else {
                    label.plausible(min_prior).copied().collect()
                }
            })
            .collect();
        if candidates.iter().all(Vec::is_empty) {
            return Ok(DisambiguationOutcome::NoPlausibleInterpretation {
                reason: format!("no sense reaches prior probability {min_prior}"),
            });
        }

        let mut current = vec![None; labels.len()];
        let mut acc = Accumulator::default();
        self.search(&candidates, 0, &mut current, cache, &mut acc)?;
        log::debug!(
            "Weighed {} combinations, {} relatedness lookups",
            acc.combinations,
            cache.scorer_calls()
        );

        Ok(match acc.best {
            Some((choices, weight)) => DisambiguationOutcome::Resolved(Resolution {
                choices,
                weight,
                sense_weights: acc.sense_weights,
                combinations: acc.combinations,
            }),
            None => DisambiguationOutcome::NoPlausibleInterpretation {
                reason: "no combination could be weighed".to_string(),
            },
        })
    }

    fn search(
        &self,
        candidates: &[Vec<CandidateSense>],
        index: usize,
        current: &mut Vec<Option<CandidateSense>>,
        cache: &mut RelatednessCache<'_>,
        acc: &mut Accumulator,
    ) -> Result<()> {
        if index == candidates.len() {
            return self.weigh(current, cache, acc);
        }
        if candidates[index].is_empty() {
            current[index] = None;
            return self.search(candidates, index + 1, current, cache, acc);
        }
        for sense in &candidates[index] {
            current[index] = Some(*sense);
            self.search(candidates, index + 1, current, cache, acc)?;
        }
        current[index] = None;
        Ok(())
    }

    fn weigh(
        &self,
        combination: &[Option<CandidateSense>],
        cache: &mut RelatednessCache<'_>,
        acc: &mut Accumulator,
    ) -> Result<()> {
        let chosen: Vec<CandidateSense> = combination.iter().flatten().copied().collect();
        if chosen.is_empty() {
            return Ok(());
        }
        acc.combinations += 1;

        let commonness =
            chosen.iter().map(|s| s.prior_probability).sum::<f64>() / chosen.len() as f64;

        let mut total = 0.0;
        let mut pairs = 0usize;
        for (i, a) in chosen.iter().enumerate() {
            for b in &chosen[i + 1..] {
                if a.page_id != b.page_id {
                    total += cache.get(a.page_id, b.page_id)?;
                    pairs += 1;
                }
            }
        }
        let relatedness = if pairs == 0 {
            self.config.default_relatedness
        } else {
            total / pairs as f64
        };

        let weight = self.config.combine(commonness, relatedness);
        if acc.best.as_ref().map_or(true, |(_, best)| weight > *best) {
            acc.best = Some((combination.to_vec(), weight));
        }
        for sense in &chosen {
            let entry = acc.sense_weights.entry(sense.page_id).or_insert(weight);
            if *entry < weight {
                *entry = weight;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sense(page_id: PageId, prior_probability: f64) -> CandidateSense {
        CandidateSense {
            page_id,
            prior_probability,
        }
    }

    /// 1 = kiwi bird, 2 = kiwifruit, 3 = New Zealand
    fn related(a: PageId, b: PageId) -> f64 {
        match (a.min(b), a.max(b)) {
            (1, 3) => 0.9,
            (2, 3) => 0.2,
            _ => 0.0,
        }
    }

    fn labels() -> Vec<CandidateLabel> {
        vec![
            CandidateLabel::new("kiwi", false, vec![sense(2, 0.6), sense(1, 0.4)]),
            CandidateLabel::new("in", true, vec![sense(9, 1.0)]),
            CandidateLabel::new("New Zealand", false, vec![sense(3, 0.95)]),
        ]
    }

    #[test]
    fn relatedness_outweighs_commonness() {
        let engine =
            ExhaustiveDisambiguator::new(&related, DisambiguationConfig::default()).unwrap();
        let outcome = engine.disambiguate(&labels()).unwrap();
        let resolution = outcome.resolution().unwrap();

        assert_eq!(
            resolution.choices,
            vec![Some(sense(1, 0.4)), None, Some(sense(3, 0.95))]
        );
        let expected = (0.675 + 3.0 * 0.9) / 4.0;
        assert!((resolution.weight - expected).abs() < 1e-12);
        assert_eq!(resolution.combinations, 2);

        // The losing sense still carries the best weight it ever reached.
        let fruit = (0.775 + 3.0 * 0.2) / 4.0;
        assert!((resolution.sense_weight(2).unwrap() - fruit).abs() < 1e-12);
        assert_eq!(resolution.sense_weight(3), Some(resolution.weight));
        assert_eq!(resolution.sense_weight(9), None);
    }

    #[test]
    fn prior_cutoff_drops_rare_senses() {
        let config = DisambiguationConfig {
            min_prior_probability: 0.5,
            ..DisambiguationConfig::default()
        };
        let engine = ExhaustiveDisambiguator::new(&related, config).unwrap();
        let outcome = engine.disambiguate(&labels()).unwrap();
        let resolution = outcome.resolution().unwrap();
        assert_eq!(resolution.choices[0], Some(sense(2, 0.6)));
        assert_eq!(resolution.combinations, 1);
    }

    #[test]
    fn single_sense_uses_default_relatedness() {
        let engine =
            ExhaustiveDisambiguator::new(&related, DisambiguationConfig::default()).unwrap();
        let labels = vec![CandidateLabel::new("Kiwi", false, vec![sense(1, 0.8)])];
        let outcome = engine.disambiguate(&labels).unwrap();
        let weight = outcome.resolution().unwrap().weight;
        assert!((weight - (0.8 + 1.5) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn nothing_plausible_is_not_an_error() {
        let engine =
            ExhaustiveDisambiguator::new(&related, DisambiguationConfig::default()).unwrap();
        assert!(matches!(
            engine.disambiguate(&[]).unwrap(),
            DisambiguationOutcome::NoPlausibleInterpretation { .. }
        ));

        let labels = vec![
            CandidateLabel::new("the", true, vec![sense(4, 0.9)]),
            CandidateLabel::new("zzz", false, vec![sense(5, 0.001)]),
        ];
        assert!(matches!(
            engine.disambiguate(&labels).unwrap(),
            DisambiguationOutcome::NoPlausibleInterpretation { .. }
        ));
    }

    #[test]
    fn repeated_runs_agree() {
        let engine =
            ExhaustiveDisambiguator::new(&related, DisambiguationConfig::default()).unwrap();
        let first = engine.disambiguate(&labels()).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.disambiguate(&labels()).unwrap(), first);
        }
    }

    #[test]
    fn shared_cache_is_hit_across_combinations() {
        let engine =
            ExhaustiveDisambiguator::new(&related, DisambiguationConfig::default()).unwrap();
        let mut cache = RelatednessCache::new(&related);
        let labels = vec![
            CandidateLabel::new("a", false, vec![sense(1, 0.5), sense(2, 0.5)]),
            CandidateLabel::new("b", false, vec![sense(3, 0.5), sense(4, 0.5)]),
            CandidateLabel::new("c", false, vec![sense(5, 0.5), sense(6, 0.5)]),
        ];
        engine.disambiguate_with(&labels, &mut cache).unwrap();
        // 8 combinations, but only 12 distinct cross-label pairs.
        assert_eq!(cache.scorer_calls(), 12);
    }
}
