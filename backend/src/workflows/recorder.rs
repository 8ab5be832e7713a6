// Execution Recorder - Audit records for individual workflow firings

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actions::ActionOutcome;
use super::WorkflowError;

/// Lifecycle of one firing. `Pending` transitions exactly once into one of
/// the terminal states and the entry is immutable afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Skipped,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Terminal result payload of a firing: a human-readable skip reason or
/// the ordered per-action outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FiringResult {
    Skipped { reason: String },
    Completed { outcomes: Vec<ActionOutcome> },
    Failed { error: String },
}

/// One audit record of a single firing of a single workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub user_id: Uuid,
    pub status: ExecutionStatus,
    /// Copy of the event payload that caused the firing. Never mutated.
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<FiringResult>,
    pub triggered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionLogEntry {
    /// Open a new pending entry for a firing.
    pub fn open(workflow_id: Uuid, user_id: Uuid, context: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            user_id,
            status: ExecutionStatus::Pending,
            context,
            result: None,
            triggered_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Query filter for listing execution history.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLogFilter {
    pub workflow_id: Option<Uuid>,
    pub status: Option<ExecutionStatus>,
}

/// Storage contract for the "workflow execution logs" collection. Entries
/// are single-writer until terminal, immutable afterwards; the engine
/// never deletes them.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Persist a freshly opened pending entry.
    async fn open(&self, entry: &ExecutionLogEntry) -> Result<(), WorkflowError>;

    /// Transition a pending entry to its terminal state. Must be a no-op
    /// for entries already terminal.
    async fn complete(
        &self,
        entry_id: Uuid,
        status: ExecutionStatus,
        result: FiringResult,
        completed_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError>;

    /// Recent entries for a user, newest first.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ExecutionLogFilter,
        limit: i64,
    ) -> Result<Vec<ExecutionLogEntry>, WorkflowError>;
}
