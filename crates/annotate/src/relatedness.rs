//! Pairwise page relatedness: the link-overlap scorer and a per-session memo.

use std::collections::HashMap;
use wikigraph_codec::PageId;
use wikigraph_graph::{LinkDirection, StatisticName, Wikipedia};

use crate::error::{AnnotateError, Result};

/// Symmetric relatedness in `[0, 1]`
pub trait Scorer {
    fn score(&self, a: PageId, b: PageId) -> Result<f64>;
}

impl<F> Scorer for F
where
    F: Fn(PageId, PageId) -> f64,
{
    fn score(&self, a: PageId, b: PageId) -> Result<f64> {
        Ok(self(a, b))
    }
}

/// Normalized link-overlap distance, inverted into a relatedness.
///
/// With `A`, `B` the neighbor sets and `m = ln(corpus size)`:
///
/// ```text
/// measure = (max(ln|A|, ln|B|) - ln|A ∩ B|) / (m - min(ln|A|, ln|B|))
/// score   = 1 - min(measure, 1)
/// ```
///
/// A direct link between the two pages counts towards the overlap.
pub struct LinkOverlapScorer<'w> {
    wiki: &'w Wikipedia,
    direction: LinkDirection,
    log_corpus_size: f64,
}

impl<'w> LinkOverlapScorer<'w> {
    /// Corpus size comes from the `articleCount` statistic, or the page
    /// table's size estimate when that is missing.
    pub fn new(wiki: &'w Wikipedia) -> Result<Self> {
        let corpus_size = match wiki.statistic(StatisticName::ArticleCount)? {
            Some(count) if count > 0 => count as f64,
            _ => {
                let estimate = wiki.page_count_estimate()?;
                log::warn!("No articleCount statistic; using page estimate {estimate}");
                estimate.max(1) as f64
            }
        };
        Ok(Self::with_corpus_size(wiki, corpus_size))
    }

    #[must_use]
    pub fn with_corpus_size(wiki: &'w Wikipedia, corpus_size: f64) -> Self {
        Self {
            wiki,
            direction: LinkDirection::In,
            log_corpus_size: corpus_size.max(1.0).ln(),
        }
    }

    #[must_use]
    pub fn direction(mut self, direction: LinkDirection) -> Self {
        self.direction = direction;
        self
    }
}

impl Scorer for LinkOverlapScorer<'_> {
    fn score(&self, a: PageId, b: PageId) -> Result<f64> {
        if a == b {
            return Ok(1.0);
        }
        let (len_a, len_b, joined) = self.wiki.intersect(a, b, self.direction)?;
        Ok(overlap_relatedness(
            len_a,
            len_b,
            joined.overlap(),
            self.log_corpus_size,
        ))
    }
}

/// Relatedness from set sizes and their overlap
#[must_use]
pub fn overlap_relatedness(len_a: usize, len_b: usize, overlap: usize, log_corpus: f64) -> f64 {
    if overlap == 0 || len_a == 0 || len_b == 0 {
        return 0.0;
    }
    let la = (len_a as f64).ln();
    let lb = (len_b as f64).ln();
    let lab = (overlap as f64).ln();
    let measure = (la.max(lb) - lab) / (log_corpus - la.min(lb)).max(f64::EPSILON);
    (1.0 - measure.min(1.0)).clamp(0.0, 1.0)
}

/// Memoizes a scorer per unordered page pair for one session
pub struct RelatednessCache<'s> {
    scorer: &'s dyn Scorer,
    scores: HashMap<(PageId, PageId), f64>,
    scorer_calls: usize,
}

impl<'s> RelatednessCache<'s> {
    pub fn new(scorer: &'s dyn Scorer) -> Self {
        Self {
            scorer,
            scores: HashMap::new(),
            scorer_calls: 0,
        }
    }

    /// Score of `(a, b)`, computed on first request for either order
    pub fn get(&mut self, a: PageId, b: PageId) -> Result<f64> {
        if a == b {
            return Ok(1.0);
        }
        let key = (a.min(b), a.max(b));
        if let Some(score) = self.scores.get(&key) {
            return Ok(*score);
        }

        let score = self.scorer.score(key.0, key.1)?;
        self.scorer_calls += 1;
        if !(0.0..=1.0).contains(&score) {
            return Err(AnnotateError::ScoreOutOfRange { a, b, score });
        }
        log::debug!("relatedness({}, {}) = {score:.4}", key.0, key.1);
        self.scores.insert(key, score);
        Ok(score)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Times the wrapped scorer was actually invoked
    #[must_use]
    pub const fn scorer_calls(&self) -> usize {
        self.scorer_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn cache_calls_scorer_once_per_pair() {
        let calls = Cell::new(0);
        let scorer = |a: PageId, b: PageId| {
            calls.set(calls.get() + 1);
            f64::from(a + b) / 100.0
        };
        let mut cache = RelatednessCache::new(&scorer);

        let first = cache.get(3, 9).unwrap();
        let second = cache.get(9, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.scorer_calls(), 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn self_pairs_skip_the_scorer() {
        let scorer = |_: PageId, _: PageId| 0.2;
        let mut cache = RelatednessCache::new(&scorer);
        assert_eq!(cache.get(4, 4).unwrap(), 1.0);
        assert_eq!(cache.scorer_calls(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn out_of_range_scores_are_errors() {
        let scorer = |_: PageId, _: PageId| 1.5;
        let mut cache = RelatednessCache::new(&scorer);
        assert!(matches!(
            cache.get(1, 2),
            Err(AnnotateError::ScoreOutOfRange { .. })
        ));
        let nan = |_: PageId, _: PageId| f64::NAN;
        let mut cache = RelatednessCache::new(&nan);
        assert!(cache.get(1, 2).is_err());
    }

    #[test]
    fn overlap_formula() {
        let log_corpus = 1000f64.ln();
        assert_eq!(overlap_relatedness(10, 20, 0, log_corpus), 0.0);

        // Identical sets score 1.
        assert!((overlap_relatedness(10, 10, 10, log_corpus) - 1.0).abs() < 1e-12);

        let expected = 1.0 - (20f64.ln() - 5f64.ln()) / (log_corpus - 10f64.ln());
        assert!((overlap_relatedness(10, 20, 5, log_corpus) - expected).abs() < 1e-12);
        assert_eq!(
            overlap_relatedness(10, 20, 5, log_corpus),
            overlap_relatedness(20, 10, 5, log_corpus)
        );
    }

    #[test]
    fn degenerate_corpus_stays_in_range() {
        let score = overlap_relatedness(3, 3, 1, 0.0);
        assert!((0.0..=1.0).contains(&score));
    }
}
