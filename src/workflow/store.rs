//! Persistence for workflow runs and steps (§3 "Workflow Run"/"Workflow
//! Step Record"), sharing the shadow cache's SQLite file and connection
//! pool so a step result and any document writes it makes commit under
//! the same storage layer.

use rusqlite::{params, OptionalExtension};

use crate::cache::{CacheError, CacheStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Suspended,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Suspended => "suspended",
        }
    }
}

#[derive(Clone)]
pub struct WorkflowStore {
    cache: CacheStore,
}

impl WorkflowStore {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    pub async fn start_run(
        &self,
        run_id: String,
        workflow_id: String,
        workflow_version: i64,
        trigger_path: Option<String>,
        started_at: i64,
        input_payload: String,
    ) -> Result<(), CacheError> {
        self.cache
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_runs
                        (run_id, workflow_id, workflow_version, input_payload, status, trigger_path, started_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        run_id,
                        workflow_id,
                        workflow_version,
                        input_payload,
                        RunStatus::Running.as_str(),
                        trigger_path,
                        started_at
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Runs still `status = 'running'` (§4.4 durability: a process that
    /// crashed mid-workflow leaves these behind). Returned as
    /// `(run_id, workflow_id, input_payload)` so the caller can re-dispatch
    /// each one through `WorkflowRunner::resume`.
    pub async fn running_runs(&self) -> Result<Vec<(String, String, String)>, CacheError> {
        self.cache
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT run_id, workflow_id, input_payload FROM workflow_runs WHERE status = ?1",
                )?;
                let rows = stmt.query_map(params![RunStatus::Running.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
    }

    /// Delete terminal (`completed`/`failed`) runs that finished before
    /// `cutoff`, and their step records via `ON DELETE CASCADE` (§4.4:
    /// runs are "retained for a configurable window ... then
    /// garbage-collected"). Runs still `running`/`suspended` are never
    /// swept, regardless of age.
    pub async fn gc_finished_before(&self, cutoff: i64) -> Result<u64, CacheError> {
        self.cache
            .with_conn(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM workflow_runs
                     WHERE status IN ('completed', 'failed') AND finished_at IS NOT NULL AND finished_at < ?1",
                    params![cutoff],
                )?;
                Ok(deleted as u64)
            })
            .await
    }

    pub async fn finish_run(
        &self,
        run_id: String,
        status: RunStatus,
        finished_at: i64,
        return_value: Option<String>,
        error: Option<String>,
    ) -> Result<(), CacheError> {
        self.cache
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE workflow_runs SET status = ?1, finished_at = ?2, return_value = ?3, error = ?4 WHERE run_id = ?5",
                    params![status.as_str(), finished_at, return_value, error, run_id],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn record_step(
        &self,
        run_id: &str,
        step_name: &str,
        attempt: u32,
        result_json: &str,
    ) -> Result<(), CacheError> {
        let run_id = run_id.to_string();
        let step_name = step_name.to_string();
        let result_json = result_json.to_string();
        let completed_at = now_unix();
        self.cache
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_steps (run_id, step_name, attempt, completed_at, result)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(run_id, step_name) DO UPDATE SET
                        attempt = excluded.attempt, completed_at = excluded.completed_at, result = excluded.result",
                    params![run_id, step_name, attempt as i64, completed_at, result_json],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_step_result(&self, run_id: &str, step_name: &str) -> Result<Option<String>, CacheError> {
        let run_id = run_id.to_string();
        let step_name = step_name.to_string();
        self.cache
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT result FROM workflow_steps WHERE run_id = ?1 AND step_name = ?2",
                    params![run_id, step_name],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(CacheError::from)
            })
            .await
    }

    /// The ordered step trace for a run (§4.4 "time-travel trace").
    pub async fn step_trace(&self, run_id: String) -> Result<Vec<(String, u32, i64)>, CacheError> {
        self.cache
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT step_name, attempt, completed_at FROM workflow_steps WHERE run_id = ?1 ORDER BY completed_at",
                )?;
                let rows = stmt.query_map(params![run_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u32, row.get::<_, i64>(2)?))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
