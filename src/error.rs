use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by a [`crate::store::FileStore`].
///
/// These are passed through to the caller unmodified; nothing in the crate
/// retries a failed store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed listing data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown file id: {0}")]
    UnknownFile(String),

    #[error("Unknown page token: {0}")]
    UnknownPage(String),

    #[error("Query clause cannot be evaluated by this store: {0}")]
    UnsupportedQuery(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No history records to restore")]
    Empty,

    #[error("Invalid history index {index}; valid range is 0..{max}")]
    InvalidIndex { index: usize, max: usize },
}

impl HistoryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HistoryError::Io {
            path: path.into(),
            source,
        }
    }
}
