use serde::{Deserialize, Serialize};

use crate::tables::TableName;

/// Which tables to hold in memory, and how to prune them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Tables materialized by warm-up
    pub tables: Vec<TableName>,

    /// Pages need more than this many inbound links to be kept.
    /// Zero keeps everything.
    pub min_links_in: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tables: vec![TableName::Page, TableName::Label, TableName::PageLinksIn],
            min_links_in: 0,
        }
    }
}

impl CacheConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            if seen.contains(table) {
                return Err(format!("table '{table}' listed twice in cache.tables"));
            }
            seen.push(*table);
        }
        Ok(())
    }

    /// True when warm-up has to compute the popular-page set
    #[must_use]
    pub const fn prunes(&self) -> bool {
        self.min_links_in > 0
    }
}
