// Workflow Automation Engine
//
// Event-driven automation for the KennelFlow platform: business events
// are routed to per-user workflows (trigger + conditions + actions),
// every firing is audited in an execution log, and individual action
// failures never abort the rest of a firing.

pub mod actions;
pub mod conditions;
pub mod dispatcher;
pub mod recorder;
pub mod registry;
pub mod router;
pub mod triggers;

#[cfg(test)]
pub mod testing;

pub use dispatcher::{ActionDispatcher, TemplateStore};
pub use recorder::{ExecutionLogEntry, ExecutionLogFilter, ExecutionLogStore, ExecutionStatus};
pub use registry::{NewWorkflow, Workflow, WorkflowRegistry, WorkflowUpdate};
pub use router::{DispatchTimeouts, TriggerRouter};
pub use triggers::TriggerType;

/// Boxed error used at the collaborator seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Firing-level failures: the engine's own bookkeeping could not be
/// performed. Action-level failures never surface here; they live inside
/// `ActionOutcome`s.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow storage error: {0}")]
    Storage(String),

    #[error("workflow {0} not found")]
    NotFound(uuid::Uuid),
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization: {err}"))
    }
}
