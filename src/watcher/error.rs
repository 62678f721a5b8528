//! Watcher error surface (§4.3, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to start filesystem watch on {path}: {source}")]
    StartFailed {
        path: std::path::PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watcher event channel closed unexpectedly")]
    ChannelClosed,
}
