//! Top-level error type for the Weaver process.
//!
//! Each component owns its own `thiserror` enum (`vault::ParseError`,
//! `cache::CacheError`, `watcher::WatcherError`, `workflow::WorkflowError`,
//! `mcp::McpSurfaceError`); this module wraps them for the composition root
//! in `main.rs`, the same shape as nika's own `error.rs`: a thin wrapping
//! enum rather than one grand unification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeaverError {
    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error(transparent)]
    Watcher(#[from] crate::watcher::WatcherError),

    #[error(transparent)]
    Workflow(#[from] crate::workflow::WorkflowError),

    #[error(transparent)]
    Mcp(#[from] crate::mcp::McpSurfaceError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WeaverError {
    /// Exit code this error should produce if it escapes `main`.
    ///
    /// Startup-fatal errors (missing vault, bad config, incompatible schema)
    /// exit 1; a storage loss discovered after startup exits 2. See §6/§7.
    pub fn exit_code(&self) -> i32 {
        match self {
            WeaverError::Config(_) => 1,
            WeaverError::Io(_) => 1,
            WeaverError::Cache(crate::cache::CacheError::SchemaIncompatible { .. }) => 1,
            WeaverError::Cache(crate::cache::CacheError::StorageUnavailable(_)) => 2,
            _ => 1,
        }
    }
}
