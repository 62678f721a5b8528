//! MCP tool surface error surface (§4.5, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpSurfaceError {
    #[error("limit {requested} exceeds the maximum of {max}")]
    LimitTooLarge { requested: usize, max: usize },

    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error(transparent)]
    Workflow(#[from] crate::workflow::WorkflowError),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("path escapes the vault root: {0}")]
    PathEscapesVault(String),
}
