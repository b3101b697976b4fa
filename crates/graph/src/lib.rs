//! # Wikigraph Graph
//!
//! Page, label, link and document-structure indexes over a wikigraph store.
//!
//! ## Features
//!
//! - **Bulk loading** - stream tab-separated relation files into tables
//! - **Lookups** - pages by id or title, labels, redirects, categories
//! - **Link graph** - in/out links with sentence positions, merge-join overlap
//! - **Document structure** - section/paragraph trees with sentence bounds
//! - **Warm-up** - cache selected tables in memory, pruned to popular pages
//!
//! ## Architecture
//!
//! ```text
//! data dir (*.tsv)
//!     │
//!     ├──> Loader (one table per relation file)
//!     │      ├─ page.tsv → page, articlesByTitle, categoriesByTitle
//!     │      ├─ label.tsv, pageLabel.tsv, pageLink{In,Out}.tsv, structure.tsv, ...
//!     │      └─ malformed line → table discarded, error with line number
//!     │
//!     ├──> StoreDir (one RocksDB per table)
//!     │
//!     └──> Wikipedia (read-only view, shared across threads)
//!            ├─ page / label / redirect / category lookups, labels of a page
//!            ├─ links, mentions, intersect
//!            ├─ structure queries (StructureQuery)
//!            └─ warm_up(CacheConfig)
//! ```

mod config;
mod error;
mod links;
mod loader;
mod structure;
mod tables;
mod warmup;
mod wikipedia;

pub use config::CacheConfig;
pub use error::{GraphError, LoadError, Result};
pub use links::{
    find_link, intersect_links, is_strictly_sorted, link_count, normalize_links,
    sentences_mentioning_all, LinkDirection, LinkEntry, LinkIntersection,
};
pub use loader::{LoadMode, LoadReport, LoadedTable, Loader, ProgressFn, TableOutcome};
pub use structure::{parse_structure, StructureBuilder, StructureQuery};
pub use tables::{
    IdListTable, LabelTable, LinkTable, PageLabelTable, PageTable, RedirectTable, StatisticName,
    StatisticsTable, StructureTable, TableName, TitleTable, TranslationTable,
};
pub use warmup::{CachedTable, WarmUpReport};
pub use wikipedia::{Page, Wikipedia};
