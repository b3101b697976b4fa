use serde::{Deserialize, Serialize};

/// Tuning for on-disk tables and bulk loads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rows written per committed batch during bulk loads
    pub commit_chunk_rows: usize,

    /// Fsync the WAL on every commit
    pub sync_on_commit: bool,

    /// Compact the full key range once a bulk load finishes
    pub compact_after_load: bool,

    /// RocksDB open-file budget per table
    pub max_open_files: i32,

    /// Rows fetched per backend iterator by table cursors
    pub cursor_page_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            commit_chunk_rows: 100_000,
            sync_on_commit: true,
            compact_after_load: true,
            max_open_files: 512,
            cursor_page_rows: 1024,
        }
    }
}

impl StoreConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.commit_chunk_rows == 0 {
            return Err("commit_chunk_rows must be greater than 0".to_string());
        }

        if self.cursor_page_rows == 0 {
            return Err("cursor_page_rows must be greater than 0".to_string());
        }

        if self.max_open_files == 0 || self.max_open_files < -1 {
            return Err("max_open_files must be positive or -1 (unlimited)".to_string());
        }

        Ok(())
    }

    /// Small chunks and pages, handy for exercising chunked paths in tests
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            commit_chunk_rows: 3,
            sync_on_commit: false,
            compact_after_load: true,
            max_open_files: 64,
            cursor_page_rows: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(StoreConfig::default().validate().is_ok());
        assert!(StoreConfig::for_tests().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = StoreConfig {
            commit_chunk_rows: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            max_open_files: -5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
