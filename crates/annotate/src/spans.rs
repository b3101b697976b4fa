//! Label spotting in free text and greedy overlap resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use wikigraph_codec::{LabelRecord, PageId};
use wikigraph_graph::Wikipedia;

use crate::config::Stopwords;
use crate::error::Result;

/// Characters that may end an n-gram. Not `\W`, so non-ASCII letters never split.
static BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\s{}()'.,;:\-_]"#).expect("boundary regex"));

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*""#).expect("quote regex"));

/// Label statistics by surface text
pub trait LabelLookup {
    fn label(&self, text: &str) -> Result<Option<Arc<LabelRecord>>>;

    /// Display title for a sense, when known
    fn page_title(&self, _id: PageId) -> Result<Option<String>> {
        Ok(None)
    }
}

impl LabelLookup for Wikipedia {
    fn label(&self, text: &str) -> Result<Option<Arc<LabelRecord>>> {
        Ok(Wikipedia::label(self, text)?)
    }

    fn page_title(&self, id: PageId) -> Result<Option<String>> {
        Ok(self.page(id)?.map(|page| page.title))
    }
}

impl LabelLookup for HashMap<String, Arc<LabelRecord>> {
    fn label(&self, text: &str) -> Result<Option<Arc<LabelRecord>>> {
        Ok(self.get(text).cloned())
    }
}

/// A region of the query that matches a known label. Offsets are byte
/// offsets into the original text and cover the trimmed n-gram.
#[derive(Debug, Clone)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub label: Arc<LabelRecord>,
    pub stopword: bool,
}

impl Span {
    /// Link probability, or zero for stopwords
    #[must_use]
    pub fn weight(&self) -> f64 {
        if self.stopword {
            0.0
        } else {
            self.label.link_probability()
        }
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Replace every quoted substring, quotes included, with `A`s of equal byte length
#[must_use]
pub fn mask_quotes(text: &str) -> String {
    QUOTED
        .replace_all(text, |caps: &regex::Captures<'_>| "A".repeat(caps[0].len()))
        .into_owned()
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub struct SpanDetector<'a> {
    labels: &'a dyn LabelLookup,
    stopwords: &'a Stopwords,
    max_lookahead: usize,
}

impl<'a> SpanDetector<'a> {
    pub fn new(
        labels: &'a dyn LabelLookup,
        stopwords: &'a Stopwords,
        max_lookahead: usize,
    ) -> Self {
        Self {
            labels,
            stopwords,
            max_lookahead: max_lookahead.max(1),
        }
    }

    /// Every n-gram of up to `max_lookahead` boundaries that names a label,
    /// ordered by start ascending then end descending.
    pub fn detect(&self, query: &str) -> Result<Vec<Span>> {
        // Sentinels guarantee a boundary before the first and after the last word.
        let padded = format!("$ {} $", mask_quotes(query));
        let bounds: Vec<(usize, usize)> = BOUNDARY
            .find_iter(&padded)
            .map(|m| (m.start(), m.end()))
            .collect();

        let mut spans = Vec::new();
        for i in 0..bounds.len() {
            let from = bounds[i].1;
            if padded[from..].chars().next().map_or(true, char::is_whitespace) {
                continue;
            }
            let last = (i + self.max_lookahead).min(bounds.len() - 1);
            for j in (i + 1..=last).rev() {
                let (start, end) = (from - 2, bounds[j].0 - 2);
                if let Some(span) = self.candidate(query, start, end)? {
                    spans.push(span);
                }
            }
        }
        // Trimming can map several n-grams onto the same region.
        spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        spans.dedup_by_key(|span| (span.start, span.end));
        log::debug!("{} candidate spans in {query:?}", spans.len());
        Ok(spans)
    }

    fn candidate(&self, query: &str, start: usize, end: usize) -> Result<Option<Span>> {
        let raw = &query[start..end];
        let trimmed_front = raw.trim_start_matches(|c: char| !is_word_char(c));
        let trimmed = trimmed_front.trim_end_matches(|c: char| !is_word_char(c));
        if trimmed.is_empty() || trimmed.find('"').is_some_and(|pos| pos > 0) {
            return Ok(None);
        }

        let Some(label) = self.labels.label(trimmed)? else {
            return Ok(None);
        };
        let offset = start + (raw.len() - trimmed_front.len());
        Ok(Some(Span {
            start: offset,
            end: offset + trimmed.len(),
            text: trimmed.to_string(),
            label,
            stopword: self.stopwords.contains(trimmed),
        }))
    }
}

/// Greedy overlap resolution over spans in (start asc, end desc) order.
///
/// Each span is compared with the run of following spans that overlap it.
/// If the run's mean weight (stopwords count as zero) beats the span, the
/// span is dropped; otherwise the whole run is.
#[must_use]
pub fn resolve_collisions(mut spans: Vec<Span>) -> Vec<Span> {
    let mut i = 0;
    while i < spans.len() {
        let own = spans[i].weight();
        let run = spans[i + 1..]
            .iter()
            .take_while(|other| spans[i].overlaps(other))
            .count();

        let run_weight = if run == 0 {
            0.0
        } else {
            spans[i + 1..=i + run].iter().map(Span::weight).sum::<f64>() / run as f64
        };

        if run_weight > own {
            spans.remove(i);
        } else {
            spans.drain(i + 1..=i + run);
            i += 1;
        }
    }
    spans
}
