// Action Dispatcher - Performs the side effect for one workflow action
//
// Constructed with explicit handles to every collaborator it needs;
// nothing is resolved from ambient state at dispatch time.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use super::actions::{ActionOutcome, WorkflowAction};
use super::triggers::TriggerEvent;
use super::BoxError;
use crate::models::{EmailTemplate, NewInteraction, NewTask};
use crate::services::templates::substitute_variables;

/// An email to send immediately.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub customer_id: Option<Uuid>,
}

/// An email to enqueue for later delivery.
#[derive(Debug, Clone)]
pub struct ScheduledEmail {
    pub user_id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub scheduled_for: DateTime<Utc>,
    pub source: String,
    pub customer_id: Option<Uuid>,
}

/// Template resolution.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn template_by_id(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<EmailTemplate>, BoxError>;
}

/// Outbound email transport and deferred-send queue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_now(&self, email: OutgoingEmail) -> Result<(), BoxError>;
    async fn schedule(&self, email: ScheduledEmail) -> Result<(), BoxError>;
}

/// Partial-update operations on customer records, keyed by customer id.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Append a tag if not already present. Returns whether the tag was
    /// newly added.
    async fn add_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError>;

    /// Remove a tag if present. Returns whether the tag was present.
    async fn remove_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError>;

    async fn set_status(&self, customer_id: Uuid, status: &str) -> Result<(), BoxError>;

    async fn append_interaction(
        &self,
        customer_id: Uuid,
        interaction: NewInteraction,
    ) -> Result<Uuid, BoxError>;
}

/// Task creation. Default priority and status come from the implementation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<Uuid, BoxError>;
}

#[derive(Clone)]
pub struct ActionDispatcher {
    templates: Arc<dyn TemplateStore>,
    mailer: Arc<dyn Mailer>,
    customers: Arc<dyn CustomerStore>,
    tasks: Arc<dyn TaskStore>,
    http: reqwest::Client,
}

impl ActionDispatcher {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        mailer: Arc<dyn Mailer>,
        customers: Arc<dyn CustomerStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            templates,
            mailer,
            customers,
            tasks,
            http: reqwest::Client::new(),
        }
    }

    /// Perform the side effect for one action against one event.
    ///
    /// Never returns an error: action-level failures (missing template,
    /// transport errors) are captured in the outcome, and an action whose
    /// required context is absent is a no-op success rather than a
    /// failure.
    pub async fn dispatch(&self, action: &WorkflowAction, event: &TriggerEvent) -> ActionOutcome {
        let start = Instant::now();

        if action.needs_customer() && event.customer().is_none() {
            info!(action = action.kind(), "Skipping action, event carries no customer");
            return ActionOutcome::noop(action, "no-op, no customer")
                .with_duration(start.elapsed().as_millis() as i64);
        }

        let result = match action {
            WorkflowAction::SendEmail { template_id } => {
                self.send_email(*template_id, event).await
            }
            WorkflowAction::ScheduleEmail {
                template_id,
                delay_days,
            } => self.schedule_email(*template_id, *delay_days, event).await,
            WorkflowAction::AddTag { tag_name } => self.add_tag(action, tag_name, event).await,
            WorkflowAction::RemoveTag { tag_name } => {
                self.remove_tag(action, tag_name, event).await
            }
            WorkflowAction::ChangeStatus { new_status } => {
                self.change_status(action, new_status, event).await
            }
            WorkflowAction::CreateTask {
                task_title,
                task_description,
                due_days,
            } => {
                self.create_task(action, task_title, task_description.clone(), *due_days, event)
                    .await
            }
            WorkflowAction::CreateInteraction { interaction_notes } => {
                self.create_interaction(action, interaction_notes.clone(), event)
                    .await
            }
            WorkflowAction::Webhook { webhook_url } => self.webhook(action, webhook_url, event).await,
            WorkflowAction::SendSms => Ok(ActionOutcome::noop(action, "sms channel not implemented")),
        };

        let duration_ms = start.elapsed().as_millis() as i64;
        match result {
            Ok(outcome) => outcome.with_duration(duration_ms),
            Err(e) => {
                error!(action = action.kind(), error = %e, "Action failed");
                ActionOutcome::failure(action, &e.to_string()).with_duration(duration_ms)
            }
        }
    }

    /// Resolve a template and render subject and body against the event
    /// context. Shared by both email paths so they substitute identically.
    async fn render_template(
        &self,
        template_id: Uuid,
        event: &TriggerEvent,
    ) -> Result<Option<(String, String)>, BoxError> {
        let Some(template) = self
            .templates
            .template_by_id(event.user_id, template_id)
            .await?
        else {
            return Ok(None);
        };

        let subject = substitute_variables(&template.subject, &event.context);
        let body = substitute_variables(&template.body, &event.context);
        Ok(Some((subject, body)))
    }

    async fn send_email(
        &self,
        template_id: Uuid,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let action = WorkflowAction::SendEmail { template_id };

        let Some(to) = event.customer_email().map(str::to_string) else {
            return Ok(ActionOutcome::noop(&action, "no-op, customer has no email address"));
        };
        let Some((subject, body)) = self.render_template(template_id, event).await? else {
            return Err(format!("email template {} not found", template_id).into());
        };

        self.mailer
            .send_now(OutgoingEmail {
                to: to.clone(),
                subject,
                body,
                customer_id: event.customer_id(),
            })
            .await?;

        Ok(ActionOutcome::success(
            &action,
            Some(serde_json::json!({ "sent_to": to, "template_id": template_id })),
        ))
    }

    async fn schedule_email(
        &self,
        template_id: Uuid,
        delay_days: i64,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let action = WorkflowAction::ScheduleEmail {
            template_id,
            delay_days,
        };

        let Some(to) = event.customer_email().map(str::to_string) else {
            return Ok(ActionOutcome::noop(&action, "no-op, customer has no email address"));
        };
        let Some((subject, body)) = self.render_template(template_id, event).await? else {
            return Err(format!("email template {} not found", template_id).into());
        };

        let scheduled_for = Utc::now() + Duration::days(delay_days);
        self.mailer
            .schedule(ScheduledEmail {
                user_id: event.user_id,
                to: to.clone(),
                subject,
                body,
                scheduled_for,
                source: "workflow".to_string(),
                customer_id: event.customer_id(),
            })
            .await?;

        Ok(ActionOutcome::success(
            &action,
            Some(serde_json::json!({
                "scheduled_to": to,
                "template_id": template_id,
                "scheduled_for": scheduled_for
            })),
        ))
    }

    async fn add_tag(
        &self,
        action: &WorkflowAction,
        tag: &str,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let Some(customer_id) = event.customer_id() else {
            return Ok(ActionOutcome::noop(action, "no-op, customer snapshot has no id"));
        };

        let added = self.customers.add_tag(customer_id, tag).await?;
        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "tag": tag, "added": added })),
        ))
    }

    async fn remove_tag(
        &self,
        action: &WorkflowAction,
        tag: &str,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let Some(customer_id) = event.customer_id() else {
            return Ok(ActionOutcome::noop(action, "no-op, customer snapshot has no id"));
        };

        let removed = self.customers.remove_tag(customer_id, tag).await?;
        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "tag": tag, "removed": removed })),
        ))
    }

    async fn change_status(
        &self,
        action: &WorkflowAction,
        status: &str,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let Some(customer_id) = event.customer_id() else {
            return Ok(ActionOutcome::noop(action, "no-op, customer snapshot has no id"));
        };

        self.customers.set_status(customer_id, status).await?;
        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "customer_id": customer_id, "new_status": status })),
        ))
    }

    async fn create_task(
        &self,
        action: &WorkflowAction,
        title: &str,
        description: Option<String>,
        due_days: Option<i64>,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let Some(customer_id) = event.customer_id() else {
            return Ok(ActionOutcome::noop(action, "no-op, customer snapshot has no id"));
        };

        let due_date = due_days.map(|days| Utc::now() + Duration::days(days));
        let task_id = self
            .tasks
            .create_task(NewTask::for_customer(
                event.user_id,
                customer_id,
                title.to_string(),
                description,
                due_date,
            ))
            .await?;

        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "task_id": task_id, "due_date": due_date })),
        ))
    }

    async fn create_interaction(
        &self,
        action: &WorkflowAction,
        notes: Option<String>,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let Some(customer_id) = event.customer_id() else {
            return Ok(ActionOutcome::noop(action, "no-op, customer snapshot has no id"));
        };

        let interaction_id = self
            .customers
            .append_interaction(customer_id, NewInteraction::outbound_from_workflow(notes))
            .await?;

        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "interaction_id": interaction_id })),
        ))
    }

    /// POST the full event context as JSON. The response body is ignored
    /// and any HTTP status counts as delivered; only a transport failure
    /// is an error.
    async fn webhook(
        &self,
        action: &WorkflowAction,
        url: &str,
        event: &TriggerEvent,
    ) -> Result<ActionOutcome, BoxError> {
        let response = self.http.post(url).json(&event.context).send().await?;
        let status = response.status().as_u16();

        Ok(ActionOutcome::success(
            action,
            Some(serde_json::json!({ "url": url, "status_code": status })),
        ))
    }
}
