// Postgres-backed stores for workflows and their execution logs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::workflows::recorder::{
    ExecutionLogEntry, ExecutionLogFilter, ExecutionLogStore, ExecutionStatus, FiringResult,
};
use crate::workflows::registry::{Workflow, WorkflowStore};
use crate::workflows::triggers::{Trigger, TriggerType};
use crate::workflows::WorkflowError;

#[derive(Clone)]
pub struct PgWorkflowStore {
    db_pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

/// Flat row shape for the `workflows` table. Conditions and actions live
/// in JSONB columns and are deserialized on the way out.
#[derive(FromRow)]
struct WorkflowRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    is_active: bool,
    trigger_type: String,
    trigger_params: Option<serde_json::Value>,
    conditions: serde_json::Value,
    actions: serde_json::Value,
    times_triggered: i64,
    last_triggered: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRow {
    fn into_workflow(self) -> Result<Workflow, WorkflowError> {
        let trigger_type: TriggerType =
            serde_json::from_value(serde_json::Value::String(self.trigger_type))?;

        Ok(Workflow {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            category: self.category,
            is_active: self.is_active,
            trigger: Trigger {
                trigger_type,
                params: self.trigger_params,
            },
            conditions: serde_json::from_value(self.conditions)?,
            actions: serde_json::from_value(self.actions)?,
            times_triggered: self.times_triggered,
            last_triggered: self.last_triggered,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const WORKFLOW_COLUMNS: &str = "id, user_id, name, description, category, is_active, \
     trigger_type, trigger_params, conditions, actions, \
     times_triggered, last_triggered, created_at, updated_at";

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn insert(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        sqlx::query(
            "INSERT INTO workflows
             (id, user_id, name, description, category, is_active,
              trigger_type, trigger_params, conditions, actions,
              times_triggered, last_triggered, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(workflow.id)
        .bind(workflow.user_id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.category)
        .bind(workflow.is_active)
        .bind(workflow.trigger.trigger_type.as_str())
        .bind(&workflow.trigger.params)
        .bind(serde_json::to_value(&workflow.conditions)?)
        .bind(serde_json::to_value(&workflow.actions)?)
        .bind(workflow.times_triggered)
        .bind(workflow.last_triggered)
        .bind(workflow.created_at)
        .bind(workflow.updated_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn fetch(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<Option<Workflow>, WorkflowError> {
        let row = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1 AND user_id = $2"
        ))
        .bind(workflow_id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        row.map(WorkflowRow::into_workflow).transpose()
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, WorkflowError> {
        let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(WorkflowRow::into_workflow).collect()
    }

    async fn list_active_by_trigger(
        &self,
        user_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Workflow>, WorkflowError> {
        let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows
             WHERE user_id = $1 AND trigger_type = $2 AND is_active = true
             ORDER BY created_at"
        ))
        .bind(user_id)
        .bind(trigger_type.as_str())
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(WorkflowRow::into_workflow).collect()
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        let result = sqlx::query(
            "UPDATE workflows SET
                name = $3, description = $4, category = $5, is_active = $6,
                trigger_type = $7, trigger_params = $8, conditions = $9,
                actions = $10, updated_at = $11
             WHERE id = $1 AND user_id = $2",
        )
        .bind(workflow.id)
        .bind(workflow.user_id)
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.category)
        .bind(workflow.is_active)
        .bind(workflow.trigger.trigger_type.as_str())
        .bind(&workflow.trigger.params)
        .bind(serde_json::to_value(&workflow.conditions)?)
        .bind(serde_json::to_value(&workflow.actions)?)
        .bind(workflow.updated_at)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::NotFound(workflow.id));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, workflow_id: Uuid) -> Result<bool, WorkflowError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1 AND user_id = $2")
            .bind(workflow_id)
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_trigger(
        &self,
        workflow_id: Uuid,
        fired_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        sqlx::query(
            "UPDATE workflows
             SET times_triggered = times_triggered + 1, last_triggered = $2
             WHERE id = $1",
        )
        .bind(workflow_id)
        .bind(fired_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgExecutionLogStore {
    db_pool: PgPool,
}

impl PgExecutionLogStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[derive(FromRow)]
struct ExecutionLogRow {
    id: Uuid,
    workflow_id: Uuid,
    user_id: Uuid,
    status: String,
    context: serde_json::Value,
    result: Option<serde_json::Value>,
    triggered_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ExecutionLogRow {
    fn into_entry(self) -> Result<ExecutionLogEntry, WorkflowError> {
        let status: ExecutionStatus =
            serde_json::from_value(serde_json::Value::String(self.status))?;
        let result: Option<FiringResult> =
            self.result.map(serde_json::from_value).transpose()?;

        Ok(ExecutionLogEntry {
            id: self.id,
            workflow_id: self.workflow_id,
            user_id: self.user_id,
            status,
            context: self.context,
            result,
            triggered_at: self.triggered_at,
            completed_at: self.completed_at,
        })
    }
}

#[async_trait]
impl ExecutionLogStore for PgExecutionLogStore {
    async fn open(&self, entry: &ExecutionLogEntry) -> Result<(), WorkflowError> {
        sqlx::query(
            "INSERT INTO workflow_execution_logs
             (id, workflow_id, user_id, status, context, triggered_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(entry.workflow_id)
        .bind(entry.user_id)
        .bind(entry.status.as_str())
        .bind(&entry.context)
        .bind(entry.triggered_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn complete(
        &self,
        entry_id: Uuid,
        status: ExecutionStatus,
        result: FiringResult,
        completed_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        // Guarded on 'pending' so a terminal entry can never be rewritten.
        sqlx::query(
            "UPDATE workflow_execution_logs
             SET status = $2, result = $3, completed_at = $4
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(entry_id)
        .bind(status.as_str())
        .bind(serde_json::to_value(&result)?)
        .bind(completed_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ExecutionLogFilter,
        limit: i64,
    ) -> Result<Vec<ExecutionLogEntry>, WorkflowError> {
        let rows = sqlx::query_as::<_, ExecutionLogRow>(
            "SELECT id, workflow_id, user_id, status, context, result,
                    triggered_at, completed_at
             FROM workflow_execution_logs
             WHERE user_id = $1
               AND ($2::uuid IS NULL OR workflow_id = $2)
               AND ($3::text IS NULL OR status = $3)
             ORDER BY triggered_at DESC
             LIMIT $4",
        )
        .bind(user_id)
        .bind(filter.workflow_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        rows.into_iter().map(ExecutionLogRow::into_entry).collect()
    }
}
