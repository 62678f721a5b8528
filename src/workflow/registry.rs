//! Workflow registration (§4.4 "Registry & lifecycle", Open Question
//! "polymorphism"): workflows are boxed async closures keyed by id,
//! rather than an enum, so new workflows can be added without touching
//! the runtime.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::context::WorkflowContext;
use super::error::WorkflowError;

pub type BoxedHandler = Arc<
    dyn Fn(
            WorkflowContext,
            serde_json::Value,
        ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, WorkflowError>> + Send>>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct WorkflowRegistration {
    pub id: String,
    pub version: i64,
    pub handler: BoxedHandler,
    /// Router rule ids that trigger this workflow; informational here, the
    /// router owns actual rule matching.
    pub triggers: Vec<String>,
}

#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<String, WorkflowRegistration>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: WorkflowRegistration) {
        self.workflows.insert(registration.id.clone(), registration);
    }

    pub fn get(&self, id: &str) -> Result<&WorkflowRegistration, WorkflowError> {
        self.workflows.get(id).ok_or_else(|| WorkflowError::UnknownWorkflow(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        self.workflows.keys().cloned().collect()
    }
}

/// Box an `async fn(WorkflowContext, Input) -> Result<Output, WorkflowError>`
/// into a `BoxedHandler`, handling JSON (de)serialization at the boundary
/// so individual workflows stay typed.
pub fn boxed_handler<I, O, F, Fut>(f: F) -> BoxedHandler
where
    I: serde::de::DeserializeOwned + Send + 'static,
    O: serde::Serialize + Send + 'static,
    F: Fn(WorkflowContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, WorkflowError>> + Send + 'static,
{
    Arc::new(move |ctx, input_json| {
        let decoded: Result<I, serde_json::Error> = serde_json::from_value(input_json);
        match decoded {
            Ok(input) => {
                let fut = f(ctx, input);
                Box::pin(async move {
                    let out = fut.await?;
                    serde_json::to_value(out).map_err(|e| WorkflowError::StepFailed {
                        run_id: String::new(),
                        step: "<encode output>".to_string(),
                        attempts: 0,
                        message: e.to_string(),
                    })
                }) as Pin<Box<dyn Future<Output = Result<serde_json::Value, WorkflowError>> + Send>>
            }
            Err(e) => Box::pin(async move {
                Err(WorkflowError::StepFailed {
                    run_id: String::new(),
                    step: "<decode input>".to_string(),
                    attempts: 0,
                    message: e.to_string(),
                })
            }),
        }
    })
}
