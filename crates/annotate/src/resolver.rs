//! Query pipeline: mask quotes, spot labels, resolve overlaps, disambiguate.

use serde::Serialize;
use wikigraph_codec::PageId;

use crate::config::{DisambiguationConfig, Stopwords};
use crate::disambiguation::{CandidateLabel, DisambiguationOutcome, ExhaustiveDisambiguator};
use crate::error::{AnnotateError, Result};
use crate::relatedness::Scorer;
use crate::spans::{is_word_char, resolve_collisions, LabelLookup, Span, SpanDetector};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSense {
    pub page_id: PageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub prior_probability: f64,
    /// Best combination weight this sense reached; absent on the simple path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLabel {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub link_probability: f64,
    pub stopword: bool,
    pub chosen: Option<PageId>,
    pub senses: Vec<RankedSense>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedQuery {
    pub query: String,
    /// Weight of the winning combination
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub labels: Vec<ResolvedLabel>,
}

pub struct QueryResolver<'a> {
    labels: &'a dyn LabelLookup,
    scorer: &'a dyn Scorer,
    stopwords: &'a Stopwords,
    config: DisambiguationConfig,
}

impl<'a> QueryResolver<'a> {
    pub fn new(
        labels: &'a dyn LabelLookup,
        scorer: &'a dyn Scorer,
        stopwords: &'a Stopwords,
        config: DisambiguationConfig,
    ) -> Result<Self> {
        config.validate().map_err(AnnotateError::Config)?;
        Ok(Self {
            labels,
            scorer,
            stopwords,
            config,
        })
    }

    /// Full pipeline over a multi-word query
    pub fn resolve(&self, query: &str) -> Result<ResolvedQuery> {
        let detector = SpanDetector::new(self.labels, self.stopwords, self.config.max_lookahead);
        let spans = resolve_collisions(detector.detect(query)?);
        log::debug!("{} spans survive collision resolution", spans.len());

        let candidates: Vec<CandidateLabel> = spans
            .iter()
            .map(|span| CandidateLabel::from_record(span.text.clone(), &span.label, span.stopword))
            .collect();
        let engine = ExhaustiveDisambiguator::new(self.scorer, self.config.clone())?;
        let outcome = engine.disambiguate(&candidates)?;

        let resolution = outcome.resolution();
        let mut labels = Vec::with_capacity(spans.len());
        for (index, (span, candidate)) in spans.iter().zip(&candidates).enumerate() {
            let chosen = resolution
                .and_then(|r| r.choices.get(index).copied().flatten())
                .map(|sense| sense.page_id);
            let mut senses = Vec::new();
            for sense in candidate.plausible(self.config.min_prior_probability) {
                senses.push(RankedSense {
                    page_id: sense.page_id,
                    title: self.labels.page_title(sense.page_id)?,
                    prior_probability: sense.prior_probability,
                    weight: Some(
                        resolution
                            .and_then(|r| r.sense_weight(sense.page_id))
                            .unwrap_or(0.0),
                    ),
                });
            }
            senses.sort_by(|a, b| {
                b.weight
                    .unwrap_or(0.0)
                    .total_cmp(&a.weight.unwrap_or(0.0))
            });
            labels.push(resolved_label(span, chosen, senses));
        }

        Ok(match outcome {
            DisambiguationOutcome::Resolved(resolution) => ResolvedQuery {
                query: query.to_string(),
                weight: Some(resolution.weight),
                reason: None,
                labels,
            },
            DisambiguationOutcome::NoPlausibleInterpretation { reason } => ResolvedQuery {
                query: query.to_string(),
                weight: None,
                reason: Some(reason),
                labels,
            },
        })
    }

    /// Treat the whole query as one label: senses above the cutoff by prior,
    /// no relatedness involved
    pub fn resolve_simple(&self, query: &str) -> Result<ResolvedQuery> {
        let front = query.trim_start_matches(|c: char| !is_word_char(c));
        let text = front.trim_end_matches(|c: char| !is_word_char(c));
        let Some(label) = self.labels.label(text)? else {
            return Ok(ResolvedQuery {
                query: query.to_string(),
                weight: None,
                reason: Some(format!("'{text}' is not a known label")),
                labels: Vec::new(),
            });
        };

        let start = query.len() - front.len();
        let span = Span {
            start,
            end: start + text.len(),
            text: text.to_string(),
            stopword: self.stopwords.contains(text),
            label,
        };
        let candidate = CandidateLabel::from_record(text, &span.label, span.stopword);
        let mut senses = Vec::new();
        for sense in candidate.plausible(self.config.min_prior_probability) {
            senses.push(RankedSense {
                page_id: sense.page_id,
                title: self.labels.page_title(sense.page_id)?,
                prior_probability: sense.prior_probability,
                weight: None,
            });
        }
        let chosen = senses.first().map(|sense| sense.page_id);
        Ok(ResolvedQuery {
            query: query.to_string(),
            weight: None,
            reason: None,
            labels: vec![resolved_label(&span, chosen, senses)],
        })
    }
}

fn resolved_label(span: &Span, chosen: Option<PageId>, senses: Vec<RankedSense>) -> ResolvedLabel {
    ResolvedLabel {
        text: span.text.clone(),
        start: span.start,
        end: span.end,
        link_probability: span.label.link_probability(),
        stopword: span.stopword,
        chosen,
        senses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Arc;
    use wikigraph_codec::{LabelRecord, SenseRecord};

    fn label(link_prob: (u32, u32), senses: &[(PageId, u32)]) -> Arc<LabelRecord> {
        let total: u32 = senses.iter().map(|(_, n)| n).sum();
        Arc::new(LabelRecord {
            doc_count: link_prob.0,
            occ_count: u64::from(link_prob.0),
            link_doc_count: link_prob.1,
            link_occ_count: u64::from(total),
            senses: senses
                .iter()
                .map(|(page_id, n)| SenseRecord {
                    page_id: *page_id,
                    link_doc_count: *n,
                    link_occ_count: *n,
                    from_title: false,
                    from_redirect: false,
                })
                .collect(),
        })
    }

    fn lookup() -> HashMap<String, Arc<LabelRecord>> {
        HashMap::from([
            ("Kiwi".to_string(), label((10, 8), &[(2, 6), (1, 4)])),
            ("New Zealand".to_string(), label((10, 9), &[(3, 19), (7, 1)])),
        ])
    }

    fn related(a: PageId, b: PageId) -> f64 {
        if (a.min(b), a.max(b)) == (1, 3) {
            0.9
        } else {
            0.1
        }
    }

    #[test]
    fn resolves_each_span_to_its_best_sense() {
        let labels = lookup();
        let stopwords: Stopwords = ["in"].into_iter().collect();
        let resolver =
            QueryResolver::new(&labels, &related, &stopwords, DisambiguationConfig::default())
                .unwrap();
        let resolved = resolver.resolve("Kiwi in New Zealand").unwrap();

        let chosen: Vec<Option<PageId>> = resolved.labels.iter().map(|l| l.chosen).collect();
        assert_eq!(chosen, vec![Some(1), Some(3)]);
        assert!(resolved.weight.is_some());

        // Senses are ranked by their best weight, not their prior.
        let kiwi: Vec<PageId> = resolved.labels[0].senses.iter().map(|s| s.page_id).collect();
        assert_eq!(kiwi, vec![1, 2]);
    }

    #[test]
    fn unknown_text_has_no_interpretation() {
        let labels = lookup();
        let stopwords = Stopwords::default();
        let resolver =
            QueryResolver::new(&labels, &related, &stopwords, DisambiguationConfig::default())
                .unwrap();
        let resolved = resolver.resolve("nothing to see").unwrap();
        assert!(resolved.labels.is_empty());
        assert!(resolved.reason.is_some());
    }

    #[test]
    fn simple_path_orders_by_prior() {
        let labels = lookup();
        let stopwords = Stopwords::default();
        let resolver =
            QueryResolver::new(&labels, &related, &stopwords, DisambiguationConfig::default())
                .unwrap();
        let resolved = resolver.resolve_simple("  \"Kiwi\"?").unwrap();
        let label = &resolved.labels[0];
        assert_eq!(label.text, "Kiwi");
        assert_eq!((label.start, label.end), (3, 7));
        assert_eq!(label.chosen, Some(2));
        assert_eq!(label.senses.len(), 2);
        assert!(label.senses.iter().all(|s| s.weight.is_none()));
    }
}
