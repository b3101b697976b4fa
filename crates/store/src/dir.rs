use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use wikigraph_codec::Codec;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::table::Table;

const WRITER_LOCK_FILE: &str = "writer.lock";

/// Exclusive build-time lock on a store directory
#[derive(Debug)]
pub struct WriterLock {
    file: std::fs::File,
    path: PathBuf,
}

impl WriterLock {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Root directory holding one sub-directory per table
#[derive(Debug, Clone)]
pub struct StoreDir {
    root: PathBuf,
    config: Arc<StoreConfig>,
}

impl StoreDir {
    pub fn new(root: impl Into<PathBuf>, config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::Config)?;
        Ok(Self {
            root: root.into(),
            config: Arc::new(config),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// True if a table with this name has been created on disk
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.table_path(name).join("CURRENT").is_file()
    }

    /// Names of all tables present on disk, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if self.exists(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Unopened handle for a table; call [`Table::open`] before use
    pub fn table<KC: Codec, VC: Codec>(&self, name: &str, keys: KC, values: VC) -> Table<KC, VC> {
        Table::new(
            name,
            self.table_path(name),
            Arc::clone(&self.config),
            keys,
            values,
        )
    }

    /// Take the single-writer lock, failing fast if another process holds it
    pub fn lock_for_writing(&self) -> Result<WriterLock> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(WRITER_LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::Locked { path: path.clone() })?;
        log::debug!("Acquired writer lock {}", path.display());
        Ok(WriterLock { file, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::OpenMode;
    use tempfile::TempDir;
    use wikigraph_codec::{I32Codec, I64Codec};

    #[test]
    fn lists_only_created_tables() {
        let dir = TempDir::new().unwrap();
        let store = StoreDir::new(dir.path(), StoreConfig::for_tests()).unwrap();
        assert!(store.table_names().unwrap().is_empty());

        let _lock = store.lock_for_writing().unwrap();
        for name in ["statistics", "page"] {
            let t = store.table(name, I32Codec, I64Codec);
            t.open(OpenMode::CreateOrTruncate).unwrap();
            t.close().unwrap();
        }
        std::fs::create_dir_all(dir.path().join("stray")).unwrap();

        assert_eq!(store.table_names().unwrap(), vec!["page", "statistics"]);
        assert!(store.exists("page"));
        assert!(!store.exists("stray"));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = StoreConfig {
            cursor_page_rows: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            StoreDir::new("/tmp/unused", config),
            Err(StoreError::Config(_))
        ));
    }
}
