//! Event Router (§4.6): binds watcher events to workflow triggers.

pub mod rules;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::watcher::FileEvent;
use crate::workflow::WorkflowRunner;

pub use rules::{FrontmatterFilter, Rule};

/// A rule+path's most recently seen event, and a generation counter used
/// to detect whether a later event superseded it before its debounce
/// window elapsed.
struct PendingFire {
    generation: u64,
    event: FileEvent,
}

/// Tracks `(rule_id, path)` pairs with an in-flight run so a rule+path
/// combination never has more than one run outstanding at once (§4.6
/// "at most one run is in flight"), plus per-rule debounce state (§4.6
/// "same rule + same path within its window -> single start using the
/// latest event").
#[derive(Clone)]
pub struct EventRouter {
    rules: Vec<Rule>,
    runner: WorkflowRunner,
    cache: CacheStore,
    in_flight: Arc<DashSet<(String, String)>>,
    debounced: Arc<DashMap<(String, String), PendingFire>>,
}

impl EventRouter {
    pub fn new(rules: Vec<Rule>, runner: WorkflowRunner, cache: CacheStore) -> Self {
        Self { rules, runner, cache, in_flight: Arc::new(DashSet::new()), debounced: Arc::new(DashMap::new()) }
    }

    /// Evaluate every rule against one watcher event and fire the matching
    /// workflows. Multiple rules may match; each gets an independent run.
    pub async fn dispatch(&self, event: &FileEvent) {
        for rule in &self.rules {
            if !rule.matches_kind_and_path(event.kind, &event.path) {
                continue;
            }

            match rule.debounce_ms {
                Some(ms) if ms > 0 => self.schedule_debounced(rule.clone(), event.clone(), ms),
                _ => self.fire(rule, event.clone()).await,
            }
        }
    }

    /// Coalesce bursts of events on the same rule+path within `window_ms`
    /// into a single fire using the latest event. A generation counter per
    /// key lets a later call cancel an earlier one's pending fire without
    /// an explicit timer handle.
    fn schedule_debounced(&self, rule: Rule, event: FileEvent, window_ms: u64) {
        let key = (rule.id.clone(), event.path.clone());
        let generation = {
            let mut slot = self.debounced.entry(key.clone()).or_insert(PendingFire { generation: 0, event: event.clone() });
            slot.generation += 1;
            slot.event = event;
            slot.generation
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(window_ms)).await;

            let latest = match this.debounced.get(&key) {
                Some(slot) if slot.generation == generation => Some(slot.event.clone()),
                _ => None, // a newer event arrived and will fire in its own task
            };
            if let Some(event) = latest {
                this.debounced.remove(&key);
                this.fire(&rule, event).await;
            }
        });
    }

    async fn fire(&self, rule: &Rule, event: FileEvent) {
        if let Some(filter) = &rule.frontmatter_filter {
            if !self.frontmatter_matches(&event.path, filter).await {
                return;
            }
        }

        let key = (rule.id.clone(), event.path.clone());
        if !self.in_flight.insert(key.clone()) {
            debug!(rule = %rule.id, path = %event.path, "dropping event: run already in flight for rule+path");
            return;
        }

        let payload = serde_json::json!({
            "event_kind": format!("{:?}", event.kind),
            "matched_path": event.path,
        });

        match self.runner.start(&rule.workflow_id, payload, Some(event.path.clone())).await {
            Ok((_run_id, rx)) => {
                let in_flight = Arc::clone(&self.in_flight);
                tokio::spawn(async move {
                    let _ = rx.await;
                    in_flight.remove(&key);
                });
            }
            Err(e) => {
                warn!(rule = %rule.id, workflow = %rule.workflow_id, error = %e, "dropping event: workflow start rejected");
                self.in_flight.remove(&key);
            }
        }
    }

    async fn frontmatter_matches(&self, path: &str, filter: &FrontmatterFilter) -> bool {
        match self.cache.get_document(path.to_string()).await {
            Ok(Some(doc)) => doc
                .frontmatter
                .get(&filter.key)
                .and_then(|v| v.as_str())
                .map(|v| v == filter.equals)
                .unwrap_or(false),
            _ => false,
        }
    }

    pub fn rule_ids(&self) -> HashSet<String> {
        self.rules.iter().map(|r| r.id.clone()).collect()
    }
}
