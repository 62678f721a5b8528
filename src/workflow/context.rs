//! `WorkflowContext` (§4.4, Open Question "workflow control flow"): the
//! handle workflow bodies use to take durable steps. Backed by the same
//! `CacheStore` the shadow cache uses, so a step's persisted record and
//! any cache writes it makes can share a transaction boundary at the
//! storage layer.

use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;

use super::error::WorkflowError;
use super::retry::{calculate_delay, RetryConfig};
use super::store::WorkflowStore;

/// Per-step overrides (§4.4: "retries, backoff, timeout").
#[derive(Debug, Clone)]
pub struct StepOptions {
    pub retry: RetryConfig,
    pub timeout: Duration,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self { retry: RetryConfig::default(), timeout: Duration::from_secs(30) }
    }
}

/// The handle passed to a running workflow body.
pub struct WorkflowContext {
    pub run_id: String,
    store: WorkflowStore,
    events: broadcast::Receiver<(String, serde_json::Value)>,
}

impl WorkflowContext {
    pub fn new(run_id: String, store: WorkflowStore, events: broadcast::Receiver<(String, serde_json::Value)>) -> Self {
        Self { run_id, store, events }
    }

    /// Execute (or replay) a named step. If `(run_id, name)` already has a
    /// completed record, its persisted result is deserialized and returned
    /// without invoking `f` (§4.4's replay contract). Otherwise `f` is run
    /// with retry, and its result is persisted exactly once on success.
    pub async fn step<T, F, Fut>(&self, name: &str, options: StepOptions, f: F) -> Result<T, WorkflowError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        if let Some(recorded) = self.store.get_step_result(&self.run_id, name).await? {
            let value: T = serde_json::from_str(&recorded)
                .map_err(|e| WorkflowError::StepFailed {
                    run_id: self.run_id.clone(),
                    step: name.to_string(),
                    attempts: 0,
                    message: format!("corrupt replay record: {e}"),
                })?;
            return Ok(value);
        }

        let mut attempt = 0u32;
        loop {
            let message = match tokio::time::timeout(options.timeout, f()).await {
                Ok(Ok(value)) => {
                    let serialized = serde_json::to_string(&value).map_err(|e| WorkflowError::StepFailed {
                        run_id: self.run_id.clone(),
                        step: name.to_string(),
                        attempts: attempt + 1,
                        message: e.to_string(),
                    })?;
                    self.store.record_step(&self.run_id, name, attempt, &serialized).await?;
                    return Ok(value);
                }
                Ok(Err(message)) => message,
                Err(_) => "step timed out".to_string(),
            };

            if attempt < options.retry.max_retries {
                tracing::warn!(run_id = %self.run_id, step = name, attempt, %message, "step failed, retrying");
                tokio::time::sleep(calculate_delay(&options.retry, attempt)).await;
                attempt += 1;
            } else {
                return Err(WorkflowError::StepFailed {
                    run_id: self.run_id.clone(),
                    step: name.to_string(),
                    attempts: attempt + 1,
                    message,
                });
            }
        }
    }

    /// Suspend this run for `duration` (§4.4 suspension point). A real
    /// scheduler could persist a wake-up marker and free the executor
    /// entirely; this yields via `tokio::time::sleep`, which is enough to
    /// free the thread for other runs.
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Suspend until an event named `name` is published on the router's
    /// event bus, or `timeout` elapses.
    pub async fn wait_for_event(
        &mut self,
        name: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, WorkflowError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(WorkflowError::WaitTimeout);
            }
            match tokio::time::timeout(remaining, self.events.recv()).await {
                Ok(Ok((event_name, payload))) if event_name == name => return Ok(payload),
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return Err(WorkflowError::WaitTimeout),
                Err(_) => return Err(WorkflowError::WaitTimeout),
            }
        }
    }
}
