//! `RuntimeContext` (Open Question "global state", resolved in
//! SPEC_FULL.md): the single composition root wiring the cache, watcher,
//! workflow runtime, and router together. Built once in `main`, in place
//! of nika's module-level singletons.

use std::path::PathBuf;

use tracing::info;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::WeaverError;
use crate::router::{EventRouter, Rule};
use crate::vault::walk::walk_vault;
use crate::vault::{parse, stale, FileTimestamps};
use crate::watcher::{FileEventKind, FileWatcher};
use crate::workflow::{builtin, WorkflowRegistry, WorkflowRunner, WorkflowStore};

pub struct RuntimeContext {
    pub config: Config,
    pub cache: CacheStore,
    pub runner: WorkflowRunner,
    pub router: EventRouter,
}

impl RuntimeContext {
    /// Build every component and perform the cold-start vault scan
    /// (§8 Scenario 1: "cold start ingest").
    pub async fn build(config: Config) -> Result<Self, WeaverError> {
        let cache = CacheStore::open(&config.cache_path)?;

        cold_start_scan(&cache, &config.vault_path, &config.weaver_data_dir(), &config.vault_extensions).await;

        let mut registry = WorkflowRegistry::new();
        registry.register(builtin::sync_tags_workflow(cache.clone()));
        registry.register(builtin::rebuild_backlinks_workflow(cache.clone()));

        let runner = WorkflowRunner::new(registry, WorkflowStore::new(cache.clone()), config.max_inflight_runs);

        // §4.4 durability / P5 / Scenario 4 ("crash mid-workflow"): any run
        // still `status = 'running'` was interrupted by a prior process
        // dying mid-execution. Re-dispatch it now, before the watch loop
        // starts, so `ctx.step`'s replay contract can pick up past its
        // last committed step.
        match runner.resume_interrupted_runs().await {
            Ok(0) => {}
            Ok(n) => info!(count = n, "resumed workflow runs interrupted by a prior crash"),
            Err(e) => tracing::error!(error = %e, "failed to resume interrupted workflow runs"),
        }

        let rules = default_rules(&config.vault_extensions).map_err(|e| WeaverError::Config(e.to_string()))?;
        let router = EventRouter::new(rules, runner.clone(), cache.clone());

        Ok(Self { config, cache, runner, router })
    }

    /// Periodically garbage-collect terminal workflow runs older than
    /// `step_retention_days` (§4.4: retained for inspection, then
    /// garbage-collected). Runs for the lifetime of the process.
    pub fn spawn_retention_sweep(&self) -> tokio::task::JoinHandle<()> {
        let store = WorkflowStore::new(self.cache.clone());
        let retention_days = self.config.step_retention_days as i64;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                let cutoff = now_unix() - retention_days * 86_400;
                match store.gc_finished_before(cutoff).await {
                    Ok(0) => {}
                    Ok(n) => info!(count = n, "garbage-collected finished workflow runs"),
                    Err(e) => tracing::error!(error = %e, "workflow run retention sweep failed"),
                }
            }
        })
    }

    /// Start the watcher and feed its events into the router for the
    /// lifetime of the process (§4.6 dispatch contract). The returned
    /// handle resolves when the watcher's event channel closes.
    pub fn spawn_watch_loop(&self) -> Result<tokio::task::JoinHandle<()>, WeaverError> {
        let mut watcher = FileWatcher::start(
            self.config.vault_path.clone(),
            self.config.weaver_data_dir(),
            self.config.debounce,
            self.config.vault_extensions.clone(),
        )?;

        let cache = self.cache.clone();
        let vault_root = self.config.vault_path.clone();
        let router = self.router.clone();
        info!(rules = ?router.rule_ids(), "event router armed");

        Ok(tokio::spawn(async move {
            while let Some(event) = watcher.recv().await {
                ingest_and_route(&cache, &vault_root, &event).await;
                router.dispatch(&event).await;
            }
        }))
    }
}

async fn ingest_and_route(cache: &CacheStore, vault_root: &PathBuf, event: &crate::watcher::FileEvent) {
    match event.kind {
        FileEventKind::Changed => {
            let absolute = vault_root.join(&event.path);
            match tokio::fs::read(&absolute).await {
                Ok(bytes) => {
                    let timestamps = file_timestamps(&absolute).await;
                    let parsed = match parse(&event.path, &bytes, timestamps) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            tracing::warn!(path = %event.path, error = %e, "parse failed; document marked stale");
                            stale(&event.path, &bytes, timestamps, &e)
                        }
                    };
                    if let Err(e) = cache.ingest_document(parsed).await {
                        tracing::error!(path = %event.path, error = %e, "ingest failed");
                    }
                }
                Err(e) => tracing::warn!(path = %event.path, error = %e, "read failed after change event"),
            }
        }
        FileEventKind::Removed => {
            if let Err(e) = cache.remove_document(event.path.clone()).await {
                tracing::error!(path = %event.path, error = %e, "remove failed");
            }
        }
    }
}

async fn file_timestamps(absolute: &std::path::Path) -> FileTimestamps {
    let metadata = tokio::fs::metadata(absolute).await.ok();
    FileTimestamps {
        created_at: metadata.as_ref().and_then(|m| m.created().ok()).and_then(to_unix).unwrap_or(0),
        modified_at: metadata.as_ref().and_then(|m| m.modified().ok()).and_then(to_unix).unwrap_or(0),
    }
}

fn to_unix(t: std::time::SystemTime) -> Option<i64> {
    t.duration_since(std::time::UNIX_EPOCH).ok().map(|d| d.as_secs() as i64)
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn cold_start_scan(
    cache: &CacheStore,
    vault_root: &std::path::Path,
    data_dir: &std::path::Path,
    extensions: &[String],
) {
    let files = walk_vault(vault_root, data_dir, extensions);
    info!(count = files.len(), "cold start scan discovered files");
    for file in files {
        let bytes = match tokio::fs::read(&file.absolute_path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %file.relative_path, error = %e, "read failed during cold start scan");
                continue;
            }
        };
        let timestamps = file_timestamps(&file.absolute_path).await;
        let parsed = match parse(&file.relative_path, &bytes, timestamps) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(path = %file.relative_path, error = %e, "cold start parse failed; document marked stale");
                stale(&file.relative_path, &bytes, timestamps, &e)
            }
        };
        if let Err(e) = cache.ingest_document(parsed).await {
            tracing::error!(path = %file.relative_path, error = %e, "cold start ingest failed");
        }
    }
}

/// One sync-tags/rebuild-backlinks rule pair per configured vault
/// extension, so the default routing matches whatever `VAULT_EXTENSIONS`
/// admits rather than hardcoding `.md` (§6).
fn default_rules(extensions: &[String]) -> Result<Vec<Rule>, globset::Error> {
    let mut rules = Vec::with_capacity(extensions.len() * 2);
    for ext in extensions {
        let pattern = format!("**/*.{ext}");
        rules.push(Rule::new(
            format!("sync-tags-on-change-{ext}"),
            "sync_tags",
            vec![FileEventKind::Changed],
            pattern.clone(),
            None,
            Some(500),
        )?);
        rules.push(Rule::new(
            format!("rebuild-backlinks-on-change-{ext}"),
            "rebuild_backlinks",
            vec![FileEventKind::Changed, FileEventKind::Removed],
            pattern,
            None,
            Some(500),
        )?);
    }
    Ok(rules)
}
