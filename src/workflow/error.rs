//! Workflow runtime error surface (§4.4, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow {0} is not registered")]
    UnknownWorkflow(String),

    #[error("step \"{step}\" in run {run_id} failed after {attempts} attempt(s): {message}")]
    StepFailed { run_id: String, step: String, attempts: u32, message: String },

    #[error("run {0} not found")]
    RunNotFound(String),

    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error("wait_for_event timed out")]
    WaitTimeout,
}
