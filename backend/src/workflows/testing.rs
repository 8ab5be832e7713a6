// In-memory fakes for every engine collaborator, used by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::dispatcher::{
    ActionDispatcher, CustomerStore, Mailer, OutgoingEmail, ScheduledEmail, TaskStore,
    TemplateStore,
};
use super::recorder::{
    ExecutionLogEntry, ExecutionLogFilter, ExecutionLogStore, ExecutionStatus, FiringResult,
};
use super::registry::{Workflow, WorkflowStore};
use super::triggers::TriggerType;
use super::{BoxError, WorkflowError};
use crate::models::{EmailTemplate, NewInteraction, NewTask};

#[derive(Default)]
pub struct MemoryWorkflowStore {
    workflows: Mutex<HashMap<Uuid, Workflow>>,
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn insert(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        self.workflows
            .lock()
            .unwrap()
            .insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn fetch(
        &self,
        user_id: Uuid,
        workflow_id: Uuid,
    ) -> Result<Option<Workflow>, WorkflowError> {
        Ok(self
            .workflows
            .lock()
            .unwrap()
            .get(&workflow_id)
            .filter(|w| w.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Workflow>, WorkflowError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.created_at);
        Ok(workflows)
    }

    async fn list_active_by_trigger(
        &self,
        user_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Workflow>, WorkflowError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .lock()
            .unwrap()
            .values()
            .filter(|w| {
                w.user_id == user_id && w.is_active && w.trigger.trigger_type == trigger_type
            })
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.created_at);
        Ok(workflows)
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        self.workflows
            .lock()
            .unwrap()
            .insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, workflow_id: Uuid) -> Result<bool, WorkflowError> {
        let mut workflows = self.workflows.lock().unwrap();
        match workflows.get(&workflow_id) {
            Some(w) if w.user_id == user_id => {
                workflows.remove(&workflow_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_trigger(
        &self,
        workflow_id: Uuid,
        fired_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let mut workflows = self.workflows.lock().unwrap();
        if let Some(w) = workflows.get_mut(&workflow_id) {
            w.times_triggered += 1;
            w.last_triggered = Some(fired_at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryExecutionLogStore {
    entries: Mutex<Vec<ExecutionLogEntry>>,
    fail_open: AtomicBool,
    fail_complete: AtomicBool,
}

impl MemoryExecutionLogStore {
    pub fn fail_next_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_complete(&self) {
        self.fail_complete.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExecutionLogStore for MemoryExecutionLogStore {
    async fn open(&self, entry: &ExecutionLogEntry) -> Result<(), WorkflowError> {
        if self.fail_open.swap(false, Ordering::SeqCst) {
            return Err(WorkflowError::Storage("injected open failure".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn complete(
        &self,
        entry_id: Uuid,
        status: ExecutionStatus,
        result: FiringResult,
        completed_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.fail_complete.swap(false, Ordering::SeqCst) {
            return Err(WorkflowError::Storage(
                "injected complete failure".to_string(),
            ));
        }
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == entry_id) {
            // Terminal entries are immutable.
            if entry.status == ExecutionStatus::Pending {
                entry.status = status;
                entry.result = Some(result);
                entry.completed_at = Some(completed_at);
            }
        }
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &ExecutionLogFilter,
        limit: i64,
    ) -> Result<Vec<ExecutionLogEntry>, WorkflowError> {
        let mut entries: Vec<ExecutionLogEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| filter.workflow_id.map_or(true, |id| e.workflow_id == id))
            .filter(|e| filter.status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<Vec<EmailTemplate>>,
}

impl MemoryTemplateStore {
    pub fn put(&self, user_id: Uuid, name: &str, subject: &str, body: &str) -> Uuid {
        let template = EmailTemplate {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let id = template.id;
        self.templates.lock().unwrap().push(template);
        id
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn template_by_id(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<EmailTemplate>, BoxError> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == template_id && t.user_id == user_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub scheduled: Mutex<Vec<ScheduledEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_now(&self, email: OutgoingEmail) -> Result<(), BoxError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err("smtp connection refused".into());
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }

    async fn schedule(&self, email: ScheduledEmail) -> Result<(), BoxError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err("smtp connection refused".into());
        }
        self.scheduled.lock().unwrap().push(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCustomerStore {
    tags: Mutex<HashMap<Uuid, Vec<String>>>,
    statuses: Mutex<HashMap<Uuid, String>>,
    interactions: Mutex<HashMap<Uuid, Vec<NewInteraction>>>,
    fail: AtomicBool,
}

impl MemoryCustomerStore {
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn tags_for(&self, customer_id: Uuid) -> Vec<String> {
        self.tags
            .lock()
            .unwrap()
            .get(&customer_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn status_for(&self, customer_id: Uuid) -> Option<String> {
        self.statuses.lock().unwrap().get(&customer_id).cloned()
    }

    pub fn interactions_for(&self, customer_id: Uuid) -> Vec<NewInteraction> {
        self.interactions
            .lock()
            .unwrap()
            .get(&customer_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check_fail(&self) -> Result<(), BoxError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err("customer store unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn add_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError> {
        self.check_fail()?;
        let mut tags = self.tags.lock().unwrap();
        let entry = tags.entry(customer_id).or_default();
        if entry.iter().any(|t| t == tag) {
            Ok(false)
        } else {
            entry.push(tag.to_string());
            Ok(true)
        }
    }

    async fn remove_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError> {
        self.check_fail()?;
        let mut tags = self.tags.lock().unwrap();
        let entry = tags.entry(customer_id).or_default();
        let before = entry.len();
        entry.retain(|t| t != tag);
        Ok(entry.len() != before)
    }

    async fn set_status(&self, customer_id: Uuid, status: &str) -> Result<(), BoxError> {
        self.check_fail()?;
        self.statuses
            .lock()
            .unwrap()
            .insert(customer_id, status.to_string());
        Ok(())
    }

    async fn append_interaction(
        &self,
        customer_id: Uuid,
        interaction: NewInteraction,
    ) -> Result<Uuid, BoxError> {
        self.check_fail()?;
        self.interactions
            .lock()
            .unwrap()
            .entry(customer_id)
            .or_default()
            .push(interaction);
        Ok(Uuid::new_v4())
    }
}

#[derive(Default)]
pub struct MemoryTaskStore {
    pub created: Mutex<Vec<NewTask>>,
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(&self, task: NewTask) -> Result<Uuid, BoxError> {
        self.created.lock().unwrap().push(task);
        Ok(Uuid::new_v4())
    }
}

/// Bundle of fakes wired the way `main` wires the real services.
#[derive(Default, Clone)]
pub struct FakeCollaborators {
    pub templates: Arc<MemoryTemplateStore>,
    pub mailer: Arc<RecordingMailer>,
    pub customers: Arc<MemoryCustomerStore>,
    pub tasks: Arc<MemoryTaskStore>,
}

impl FakeCollaborators {
    pub fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(
            self.templates.clone(),
            self.mailer.clone(),
            self.customers.clone(),
            self.tasks.clone(),
        )
    }
}
