use futures::future::BoxFuture;
use std::sync::Arc;

use crate::error::EngineError;
use crate::runner::context::SessionContext;

/// How a step's failure affects the rest of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// Failure aborts the workflow; later steps never run.
    Critical,
    /// Failure is recorded and the workflow continues.
    Optional,
}

pub type StepAction =
    Box<dyn Fn(Arc<SessionContext>) -> BoxFuture<'static, Result<(), EngineError>> + Send + Sync>;

/// One unit of work in a workflow: a name for the log, a criticality, and
/// the action itself.
pub struct WorkflowStep {
    pub name: String,
    pub criticality: Criticality,
    pub action: StepAction,
}

impl WorkflowStep {
    pub fn new<F>(name: impl Into<String>, criticality: Criticality, action: F) -> Self
    where
        F: Fn(Arc<SessionContext>) -> BoxFuture<'static, Result<(), EngineError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            criticality,
            action: Box::new(action),
        }
    }

    pub fn critical<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<SessionContext>) -> BoxFuture<'static, Result<(), EngineError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, Criticality::Critical, action)
    }

    pub fn optional<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(Arc<SessionContext>) -> BoxFuture<'static, Result<(), EngineError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, Criticality::Optional, action)
    }
}
