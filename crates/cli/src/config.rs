use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wikigraph_annotate::{DisambiguationConfig, Stopwords};
use wikigraph_graph::CacheConfig;
use wikigraph_store::StoreConfig;

const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "to", "was", "with",
];

/// Everything the `wikigraph` binary reads from `--config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikigraphConfig {
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub disambiguation: DisambiguationConfig,
    pub stopwords: Vec<String>,
}

impl Default for WikigraphConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            disambiguation: DisambiguationConfig::default(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| (*w).to_string()).collect(),
        }
    }
}

impl WikigraphConfig {
    /// Read and validate a TOML file; no path means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate().map_err(|e| format!("[store] {e}"))?;
        self.cache.validate().map_err(|e| format!("[cache] {e}"))?;
        self.disambiguation
            .validate()
            .map_err(|e| format!("[disambiguation] {e}"))?;
        Ok(())
    }

    #[must_use]
    pub fn stopwords(&self) -> Stopwords {
        self.stopwords.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikigraph_graph::TableName;

    #[test]
    fn test_default_config_valid() {
        let config = WikigraphConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.stopwords().contains("The"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: WikigraphConfig = toml::from_str(
            r#"
            stopwords = ["le", "la"]

            [store]
            commit_chunk_rows = 500

            [cache]
            tables = ["page", "pageLinksOut"]
            min_links_in = 3

            [disambiguation]
            min_prior_probability = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.store.commit_chunk_rows, 500);
        assert!(config.store.sync_on_commit);
        assert_eq!(config.cache.tables, vec![TableName::Page, TableName::PageLinksOut]);
        assert_eq!(config.disambiguation.max_lookahead, 15);
        assert!(!config.stopwords().contains("the"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_section_is_named() {
        let mut config = WikigraphConfig::default();
        config.disambiguation.max_lookahead = 0;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("[disambiguation]"), "{err}");
    }
}
