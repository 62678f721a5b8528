//! Cache error surface (§4.2, §7). `WeaverError` wraps these transparently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("shadow cache storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("shadow cache schema is {found} but this binary expects {expected}")]
    SchemaIncompatible { found: i64, expected: i64 },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("concurrent ingest conflict for {0}")]
    IngestConflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::StorageUnavailable(err.to_string())
    }
}
