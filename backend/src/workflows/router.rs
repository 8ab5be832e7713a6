// Trigger Router - Entry point of the workflow engine
//
// Routes a business event to every active workflow registered for its
// trigger type and runs each one through the firing pipeline:
// open log entry -> evaluate conditions -> dispatch actions -> close entry.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::actions::{ActionOutcome, WorkflowAction};
use super::conditions;
use super::recorder::{ExecutionLogEntry, ExecutionLogStore, ExecutionStatus, FiringResult};
use super::registry::{Workflow, WorkflowRegistry};
use super::triggers::{EventContext, TriggerEvent, TriggerType};
use super::dispatcher::ActionDispatcher;
use super::WorkflowError;

/// Upper bounds on how long a single action dispatch may run. A hanging
/// external call must not stall the remaining actions of a firing.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimeouts {
    pub action: Duration,
    pub webhook: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            action: Duration::from_secs(30),
            webhook: Duration::from_secs(10),
        }
    }
}

impl DispatchTimeouts {
    fn for_action(&self, action: &WorkflowAction) -> Duration {
        match action {
            WorkflowAction::Webhook { .. } => self.webhook,
            _ => self.action,
        }
    }
}

pub struct TriggerRouter {
    registry: WorkflowRegistry,
    logs: Arc<dyn ExecutionLogStore>,
    dispatcher: ActionDispatcher,
    timeouts: DispatchTimeouts,
}

impl TriggerRouter {
    pub fn new(
        registry: WorkflowRegistry,
        logs: Arc<dyn ExecutionLogStore>,
        dispatcher: ActionDispatcher,
        timeouts: DispatchTimeouts,
    ) -> Self {
        Self {
            registry,
            logs,
            dispatcher,
            timeouts,
        }
    }

    /// Route one event to all matching active workflows.
    ///
    /// Fire-and-forget: nothing is returned to the caller; results are
    /// inspected through the execution log. A firing-level failure in one
    /// workflow is logged and never prevents its siblings from running.
    pub async fn route(&self, user_id: Uuid, trigger_type: TriggerType, context: EventContext) {
        let event = TriggerEvent::new(user_id, trigger_type, context);

        let workflows = match self
            .registry
            .store()
            .list_active_by_trigger(user_id, trigger_type)
            .await
        {
            Ok(workflows) => workflows,
            Err(e) => {
                error!(%user_id, trigger = trigger_type.as_str(), error = %e, "Failed to load workflows for event");
                return;
            }
        };

        info!(
            trigger = trigger_type.as_str(),
            matched = workflows.len(),
            "Routing event"
        );

        for workflow in &workflows {
            if let Err(e) = self.fire(workflow, &event).await {
                error!(
                    workflow_id = %workflow.id,
                    workflow = %workflow.name,
                    error = %e,
                    "Workflow firing failed"
                );
            }
        }
    }

    /// Run one workflow against one event, producing exactly one
    /// execution log entry.
    async fn fire(&self, workflow: &Workflow, event: &TriggerEvent) -> Result<(), WorkflowError> {
        let entry = ExecutionLogEntry::open(workflow.id, event.user_id, event.context.clone());
        self.logs.open(&entry).await?;

        let (status, result) = self.execute(workflow, event).await;

        if let Err(e) = self.finish(&entry, workflow, status, result).await {
            // Bookkeeping failed mid-firing: leave a failed terminal mark
            // if the entry is still pending, then surface to the router.
            let _ = self
                .logs
                .complete(
                    entry.id,
                    ExecutionStatus::Failed,
                    FiringResult::Failed {
                        error: e.to_string(),
                    },
                    Utc::now(),
                )
                .await;
            return Err(e);
        }

        Ok(())
    }

    /// Condition gate plus the sequential action loop. Infallible: every
    /// action-level problem ends up inside an outcome, not as an error.
    async fn execute(
        &self,
        workflow: &Workflow,
        event: &TriggerEvent,
    ) -> (ExecutionStatus, FiringResult) {
        if !conditions::evaluate_all(&workflow.conditions, &event.context) {
            info!(workflow_id = %workflow.id, "Conditions not met, skipping");
            return (
                ExecutionStatus::Skipped,
                FiringResult::Skipped {
                    reason: "Conditions not met".to_string(),
                },
            );
        }

        if workflow.actions.is_empty() {
            warn!(workflow_id = %workflow.id, "Workflow has no actions");
        }

        // Actions run strictly in authored order, each awaited before the
        // next starts, and a failed action never short-circuits the rest.
        let mut outcomes = Vec::with_capacity(workflow.actions.len());
        for action in &workflow.actions {
            let bound = self.timeouts.for_action(action);
            let outcome = match timeout(bound, self.dispatcher.dispatch(action, event)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        workflow_id = %workflow.id,
                        action = action.kind(),
                        "Action timed out"
                    );
                    ActionOutcome::failure(
                        action,
                        &format!("action timed out after {}ms", bound.as_millis()),
                    )
                    .with_duration(bound.as_millis() as i64)
                }
            };
            outcomes.push(outcome);
        }

        (
            ExecutionStatus::Completed,
            FiringResult::Completed { outcomes },
        )
    }

    /// Close the log entry and bump the workflow's usage counters.
    async fn finish(
        &self,
        entry: &ExecutionLogEntry,
        workflow: &Workflow,
        status: ExecutionStatus,
        result: FiringResult,
    ) -> Result<(), WorkflowError> {
        self.logs
            .complete(entry.id, status, result, Utc::now())
            .await?;
        self.registry
            .store()
            .record_trigger(workflow.id, Utc::now())
            .await?;
        Ok(())
    }
}
