use std::path::PathBuf;
use thiserror::Error;
use wikigraph_codec::InvariantError;
use wikigraph_store::StoreError;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid structure string: {0}")]
    Structure(String),

    #[error("Invalid link list for page {page}: {reason}")]
    LinkList { page: i32, reason: String },

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error("{0}")]
    Other(String),
}

/// Failures while bulk loading relation files
#[derive(Error, Debug)]
pub enum LoadError {
    /// A line could not be parsed; the whole load is abandoned
    #[error("{}:{line}: {reason}", file.display())]
    Malformed {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Data directory {0} does not exist")]
    MissingDataDir(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
