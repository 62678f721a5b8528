//! Workflow scheduler (§4.4 "Registry & lifecycle"): `start` spawns a run
//! as its own tokio task (cooperative per-run, concurrent across runs,
//! matching "single-threaded per run... sharing a thread pool"); a
//! semaphore caps `max_inflight_runs`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, oneshot, Semaphore};
use uuid::Uuid;

use super::context::WorkflowContext;
use super::error::WorkflowError;
use super::registry::{WorkflowRegistration, WorkflowRegistry};
use super::store::{RunStatus, WorkflowStore};

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[derive(Clone)]
pub struct WorkflowRunner {
    registry: Arc<WorkflowRegistry>,
    store: WorkflowStore,
    semaphore: Arc<Semaphore>,
    event_bus: broadcast::Sender<(String, serde_json::Value)>,
}

impl WorkflowRunner {
    pub fn new(registry: WorkflowRegistry, store: WorkflowStore, max_inflight_runs: usize) -> Self {
        let (event_bus, _) = broadcast::channel(256);
        Self {
            registry: Arc::new(registry),
            store,
            semaphore: Arc::new(Semaphore::new(max_inflight_runs.max(1))),
            event_bus,
        }
    }

    pub fn registered_workflow_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Publish an event visible to any run currently in `wait_for_event`.
    pub fn publish_event(&self, name: String, payload: serde_json::Value) {
        let _ = self.event_bus.send((name, payload));
    }

    /// Allocate a run id, persist the start record, and spawn execution.
    /// Returns a handle that resolves with the run's terminal value.
    pub async fn start(
        &self,
        workflow_id: &str,
        input: serde_json::Value,
        trigger_path: Option<String>,
    ) -> Result<(String, oneshot::Receiver<Result<serde_json::Value, WorkflowError>>), WorkflowError> {
        let registration = self.registry.get(workflow_id)?.clone();
        let run_id = Uuid::new_v4().to_string();

        self.store
            .start_run(
                run_id.clone(),
                workflow_id.to_string(),
                registration.version,
                trigger_path,
                now_unix(),
                input.to_string(),
            )
            .await?;

        let rx = self.spawn_execution(run_id.clone(), registration, input);
        Ok((run_id, rx))
    }

    /// Re-dispatch a run a crashed process left `status = 'running'`
    /// (§4.4 durability, P5, Scenario 4 "crash mid-workflow"). The run
    /// record and any already-completed step results persist across the
    /// restart; `ctx.step`'s replay contract means only the steps that
    /// never committed actually re-execute.
    pub async fn resume(
        &self,
        run_id: String,
        workflow_id: &str,
        input: serde_json::Value,
    ) -> Result<oneshot::Receiver<Result<serde_json::Value, WorkflowError>>, WorkflowError> {
        let registration = self.registry.get(workflow_id)?.clone();
        Ok(self.spawn_execution(run_id, registration, input))
    }

    fn spawn_execution(
        &self,
        run_id: String,
        registration: WorkflowRegistration,
        input: serde_json::Value,
    ) -> oneshot::Receiver<Result<serde_json::Value, WorkflowError>> {
        let (tx, rx) = oneshot::channel();
        let semaphore = Arc::clone(&self.semaphore);
        let store = self.store.clone();
        let events = self.event_bus.subscribe();
        let run_id_for_task = run_id;

        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let ctx = WorkflowContext::new(run_id_for_task.clone(), store.clone(), events);
            let result = (registration.handler)(ctx, input).await;

            let finished_at = now_unix();
            match &result {
                Ok(value) => {
                    let _ = store
                        .finish_run(
                            run_id_for_task.clone(),
                            RunStatus::Completed,
                            finished_at,
                            Some(value.to_string()),
                            None,
                        )
                        .await;
                }
                Err(e) => {
                    let _ = store
                        .finish_run(run_id_for_task.clone(), RunStatus::Failed, finished_at, None, Some(e.to_string()))
                        .await;
                }
            }

            let _ = tx.send(result);
        });

        rx
    }

    pub async fn step_trace(&self, run_id: String) -> Result<Vec<(String, u32, i64)>, WorkflowError> {
        Ok(self.store.step_trace(run_id).await?)
    }

    /// List runs left `running` by a crashed process and re-dispatch each
    /// one through `resume` (§4.4 durability, P5, Scenario 4). Called once
    /// at startup before the watch loop begins.
    pub async fn resume_interrupted_runs(&self) -> Result<usize, WorkflowError> {
        let runs = self.store.running_runs().await?;
        let mut resumed = 0;
        for (run_id, workflow_id, input_payload) in runs {
            let input: serde_json::Value = serde_json::from_str(&input_payload).unwrap_or(serde_json::Value::Null);
            match self.resume(run_id.clone(), &workflow_id, input).await {
                Ok(_rx) => {
                    tracing::info!(run_id = %run_id, workflow_id = %workflow_id, "resumed interrupted workflow run");
                    resumed += 1;
                }
                Err(e) => {
                    tracing::error!(run_id = %run_id, workflow_id = %workflow_id, error = %e, "failed to resume interrupted run");
                }
            }
        }
        Ok(resumed)
    }
}
