//! # Wikigraph Annotate
//!
//! Turns a short free-text query into page senses.
//!
//! ## Pipeline
//!
//! ```text
//! query
//!   │
//!   ├──> mask_quotes        "National Park" stays one token
//!   ├──> SpanDetector       n-grams (≤ max_lookahead boundaries) that are labels
//!   ├──> resolve_collisions greedy: span vs. mean weight of its overlapping run
//!   ├──> ExhaustiveDisambiguator
//!   │      ├─ every combination of plausible senses
//!   │      ├─ weight = (commonness + 3·relatedness) / 4
//!   │      └─ RelatednessCache → Scorer (LinkOverlapScorer over Wikipedia)
//!   └──> ResolvedQuery      chosen sense + ranked alternatives per span
//! ```

mod config;
mod disambiguation;
mod error;
mod relatedness;
mod resolver;
mod spans;

pub use config::{DisambiguationConfig, Stopwords};
pub use disambiguation::{
    CandidateLabel, CandidateSense, DisambiguationOutcome, ExhaustiveDisambiguator, Resolution,
};
pub use error::{AnnotateError, Result};
pub use relatedness::{overlap_relatedness, LinkOverlapScorer, RelatednessCache, Scorer};
pub use resolver::{QueryResolver, RankedSense, ResolvedLabel, ResolvedQuery};
pub use spans::{mask_quotes, resolve_collisions, LabelLookup, Span, SpanDetector};
