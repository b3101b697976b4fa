use std::path::PathBuf;
use thiserror::Error;
use wikigraph_codec::{DecodeError, EncodeError};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A read-only open found no table on disk
    #[error("Table '{table}' does not exist at {path}")]
    TableMissing { table: String, path: PathBuf },

    /// Operation on a table that is not connected
    #[error("Table '{table}' is {state}")]
    Closed { table: String, state: &'static str },

    #[error("Corrupt value in table '{table}': {source}")]
    Decode {
        table: String,
        #[source]
        source: DecodeError,
    },

    #[error("Cannot encode value for table '{table}': {source}")]
    Encode {
        table: String,
        #[source]
        source: EncodeError,
    },

    /// Write-mode reopen while cursors are still reading
    #[error("Table '{table}' has {readers} active reader(s)")]
    Busy { table: String, readers: usize },

    #[error("Table '{table}' was opened read-only")]
    ReadOnly { table: String },

    /// Another process holds the store's writer lock
    #[error("Store at {path} is locked by another writer")]
    Locked { path: PathBuf },

    #[error("Storage error in table '{table}': {source}")]
    Backend {
        table: String,
        #[source]
        source: rocksdb::Error,
    },

    #[error("Invalid store configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the failure only means an optional table is absent
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::TableMissing { .. })
    }

    pub(crate) fn backend(table: &str, source: rocksdb::Error) -> Self {
        Self::Backend {
            table: table.to_string(),
            source,
        }
    }

    pub(crate) fn decode(table: &str, source: DecodeError) -> Self {
        Self::Decode {
            table: table.to_string(),
            source,
        }
    }

    pub(crate) fn encode(table: &str, source: EncodeError) -> Self {
        Self::Encode {
            table: table.to_string(),
            source,
        }
    }
}
