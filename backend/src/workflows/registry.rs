// Workflow Registry - Stored automation rules for a user

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::actions::WorkflowAction;
use super::conditions::Condition;
use super::triggers::{Trigger, TriggerType};
use super::WorkflowError;

/// A stored automation rule: trigger, flat condition list, ordered actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form classification tag, not behaviorally significant.
    pub category: String,
    pub is_active: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
    pub times_triggered: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields accepted when creating a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_active: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<WorkflowAction>,
}

fn default_category() -> String {
    "general".to_string()
}

/// A field that was present in the payload deserializes to `Some`, even
/// when its value is null.
fn nullable_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update; absent fields keep their current value. `description`
/// distinguishes absent (keep) from explicit null (clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "nullable_field"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default)]
    pub actions: Option<Vec<WorkflowAction>>,
}

/// Storage contract for the "workflows" collection.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn insert(&self, workflow: &Workflow) -> Result<(), WorkflowError>;

    async fn fetch(&self, user_id: Uuid, workflow_id: Uuid) -> Result<Option<Workflow>, WorkflowError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, WorkflowError>;

    /// Active workflows for a user registered for the given trigger type.
    async fn list_active_by_trigger(
        &self,
        user_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Workflow>, WorkflowError>;

    async fn update(&self, workflow: &Workflow) -> Result<(), WorkflowError>;

    async fn delete(&self, user_id: Uuid, workflow_id: Uuid) -> Result<bool, WorkflowError>;

    /// Bump `times_triggered` and stamp `last_triggered` after a terminal
    /// firing.
    async fn record_trigger(
        &self,
        workflow_id: Uuid,
        fired_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError>;
}

/// Registry operations over the workflow store: creation, partial update,
/// activation toggling and starter seeding.
#[derive(Clone)]
pub struct WorkflowRegistry {
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowRegistry {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Create a workflow: assigns the id, zeroes the usage counters and
    /// stamps the creation time.
    pub async fn create(&self, user_id: Uuid, new: NewWorkflow) -> Result<Workflow, WorkflowError> {
        let workflow = Workflow {
            id: Uuid::new_v4(),
            user_id,
            name: new.name,
            description: new.description,
            category: new.category,
            is_active: new.is_active,
            trigger: new.trigger,
            conditions: new.conditions,
            actions: new.actions,
            times_triggered: 0,
            last_triggered: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.store.insert(&workflow).await?;
        info!(workflow_id = %workflow.id, name = %workflow.name, "Workflow created");
        Ok(workflow)
    }

    pub async fn get(&self, user_id: Uuid, workflow_id: Uuid) -> Result<Option<Workflow>, WorkflowError> {
        self.store.fetch(user_id, workflow_id).await
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Workflow>, WorkflowError> {
        self.store.list_for_user(user_id).await
    }

    /// Merge a partial update into the stored workflow and stamp
    /// `updated_at`.
    pub async fn update(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
        update: WorkflowUpdate,
    ) -> Result<Option<Workflow>, WorkflowError> {
        let Some(mut workflow) = self.store.fetch(user_id, workflow_id).await? else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            workflow.name = name;
        }
        if let Some(description) = update.description {
            workflow.description = description;
        }
        if let Some(category) = update.category {
            workflow.category = category;
        }
        if let Some(is_active) = update.is_active {
            workflow.is_active = is_active;
        }
        if let Some(trigger) = update.trigger {
            workflow.trigger = trigger;
        }
        if let Some(conditions) = update.conditions {
            workflow.conditions = conditions;
        }
        if let Some(actions) = update.actions {
            workflow.actions = actions;
        }
        workflow.updated_at = Some(Utc::now());

        self.store.update(&workflow).await?;
        Ok(Some(workflow))
    }

    /// Hard delete. Execution logs referencing the workflow are kept.
    pub async fn delete(&self, user_id: Uuid, workflow_id: Uuid) -> Result<bool, WorkflowError> {
        self.store.delete(user_id, workflow_id).await
    }

    /// Convenience over `update` for flipping the active flag.
    pub async fn set_active(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Workflow>, WorkflowError> {
        self.update(
            user_id,
            workflow_id,
            WorkflowUpdate {
                is_active: Some(is_active),
                ..Default::default()
            },
        )
        .await
    }

    /// Seed the starter workflows for a user who has none yet. Starters
    /// are created disabled so the operator must opt in explicitly.
    /// Returns the number of workflows created (0 if the user already has
    /// any).
    pub async fn seed_starters(&self, user_id: Uuid) -> Result<usize, WorkflowError> {
        let existing = self.store.list_for_user(user_id).await?;
        if !existing.is_empty() {
            return Ok(0);
        }

        let starters = starters::all();
        let count = starters.len();
        for starter in starters {
            self.create(user_id, starter).await?;
        }

        info!(%user_id, count, "Seeded starter workflows");
        Ok(count)
    }
}

/// Pre-built starter workflows offered to new users. All template-free so
/// they work before the user has authored any email templates.
pub mod starters {
    use super::*;

    pub fn all() -> Vec<NewWorkflow> {
        vec![
            welcome_new_inquiry(),
            litter_announcement_prep(),
            pickup_follow_up(),
            overdue_payment_chase(),
            birthday_greeting_reminder(),
        ]
    }

    pub fn welcome_new_inquiry() -> NewWorkflow {
        NewWorkflow {
            name: "Welcome new inquiry".to_string(),
            description: Some("Tag fresh inquiries and queue a same-day reply task".to_string()),
            category: "customers".to_string(),
            is_active: false,
            trigger: Trigger::new(TriggerType::CustomerCreated),
            conditions: Vec::new(),
            actions: vec![
                WorkflowAction::AddTag {
                    tag_name: "new-inquiry".to_string(),
                },
                WorkflowAction::CreateTask {
                    task_title: "Reply to new inquiry".to_string(),
                    task_description: Some("Respond within one business day".to_string()),
                    due_days: Some(1),
                },
            ],
        }
    }

    pub fn litter_announcement_prep() -> NewWorkflow {
        NewWorkflow {
            name: "Litter announcement prep".to_string(),
            description: Some("Queue waitlist outreach when a litter is born".to_string()),
            category: "litters".to_string(),
            is_active: false,
            trigger: Trigger::new(TriggerType::LitterBorn),
            conditions: Vec::new(),
            actions: vec![WorkflowAction::CreateTask {
                task_title: "Notify waitlist about new litter".to_string(),
                task_description: Some("Photos, birth details, reservation order".to_string()),
                due_days: Some(2),
            }],
        }
    }

    pub fn pickup_follow_up() -> NewWorkflow {
        NewWorkflow {
            name: "Pickup follow-up".to_string(),
            description: Some("Check in a few days after a puppy goes home".to_string()),
            category: "customers".to_string(),
            is_active: false,
            trigger: Trigger::new(TriggerType::DaysAfterPickup)
                .with_params(serde_json::json!({ "days": 3 })),
            conditions: Vec::new(),
            actions: vec![
                WorkflowAction::CreateInteraction {
                    interaction_notes: Some("Automated post-pickup check-in queued".to_string()),
                },
                WorkflowAction::CreateTask {
                    task_title: "Post-pickup check-in call".to_string(),
                    task_description: None,
                    due_days: Some(1),
                },
            ],
        }
    }

    pub fn overdue_payment_chase() -> NewWorkflow {
        NewWorkflow {
            name: "Overdue payment chase".to_string(),
            description: Some("Flag overdue customers and queue a follow-up".to_string()),
            category: "payments".to_string(),
            is_active: false,
            trigger: Trigger::new(TriggerType::PaymentOverdue),
            conditions: Vec::new(),
            actions: vec![
                WorkflowAction::AddTag {
                    tag_name: "payment-overdue".to_string(),
                },
                WorkflowAction::CreateTask {
                    task_title: "Follow up on overdue payment".to_string(),
                    task_description: None,
                    due_days: Some(1),
                },
            ],
        }
    }

    pub fn birthday_greeting_reminder() -> NewWorkflow {
        NewWorkflow {
            name: "Birthday greeting reminder".to_string(),
            description: Some("Queue a birthday greeting on each puppy birthday".to_string()),
            category: "customers".to_string(),
            is_active: false,
            trigger: Trigger::new(TriggerType::PuppyBirthday),
            conditions: Vec::new(),
            actions: vec![WorkflowAction::CreateTask {
                task_title: "Send birthday greeting".to_string(),
                task_description: None,
                due_days: None,
            }],
        }
    }
}
