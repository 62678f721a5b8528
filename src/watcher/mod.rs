//! File Watcher (§4.3): a `notify::RecommendedWatcher` feeding a debouncer,
//! producing a stream of coalesced `FileEvent`s the router consumes.
//! Structurally this is nika's own TUI `FileWatcher` (sync notify callback
//! → std mpsc → tokio task → async mpsc) generalized from `.nika.yaml`
//! filtering to the full vault and handed a debounce stage.

pub mod debounce;
pub mod error;
pub mod events;

use std::path::PathBuf;
use std::sync::mpsc as sync_mpsc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

pub use error::WatcherError;
pub use events::{FileEvent, FileEventKind};

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<FileEvent>,
}

impl FileWatcher {
    /// Start watching `vault_root` recursively, excluding `data_dir`, and
    /// emit debounced events after `debounce_window`.
    pub fn start(
        vault_root: PathBuf,
        data_dir: PathBuf,
        debounce_window: Duration,
        extensions: Vec<String>,
    ) -> Result<Self, WatcherError> {
        let (sync_tx, sync_rx) = sync_mpsc::channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Ok(event) = result {
                    let _ = sync_tx.send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(|source| WatcherError::StartFailed { path: vault_root.clone(), source })?;

        watcher
            .watch(&vault_root, RecursiveMode::Recursive)
            .map_err(|source| WatcherError::StartFailed { path: vault_root.clone(), source })?;

        let (raw_tx, raw_rx) = mpsc::channel(256);
        let (out_tx, event_rx) = mpsc::channel(256);

        let root_clone = vault_root.clone();
        let data_clone = data_dir.clone();
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for file_event in events::from_notify_event(&event, &root_clone, &data_clone, &extensions) {
                    if raw_tx.blocking_send(file_event).is_err() {
                        break;
                    }
                }
            }
        });

        tokio::spawn(debounce::run_debouncer(raw_rx, out_tx, debounce_window));

        Ok(Self { _watcher: watcher, event_rx })
    }

    /// Receive the next coalesced event, suspending the caller until one
    /// is ready (§5: watcher reads are a suspension point).
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.event_rx.recv().await
    }
}
