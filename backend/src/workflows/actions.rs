// Workflow Actions - The closed set of side effects a workflow can perform

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An action specification as authored on a workflow. Internally tagged so
/// adding a new kind is a compile-time exercise, not a runtime fallthrough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowAction {
    /// Resolve a template, substitute variables and send immediately.
    SendEmail { template_id: Uuid },
    /// Resolve and render now, enqueue for delivery after `delay_days`.
    ScheduleEmail { template_id: Uuid, delay_days: i64 },
    /// Append a tag to the customer's tag set (idempotent).
    AddTag { tag_name: String },
    /// Remove a tag if present (idempotent).
    RemoveTag { tag_name: String },
    /// Overwrite the customer's classification field.
    ChangeStatus { new_status: String },
    /// Create a task record linked to the customer.
    CreateTask {
        task_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_days: Option<i64>,
    },
    /// Append an outbound interaction to the customer's history.
    CreateInteraction {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interaction_notes: Option<String>,
    },
    /// POST the full event context as JSON. Fire-and-forget; the response
    /// is ignored, only transport failure is an error.
    Webhook { webhook_url: String },
    /// Placeholder for a future channel.
    SendSms,
}

impl WorkflowAction {
    /// Stable kind name, used in execution log outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendEmail { .. } => "send_email",
            Self::ScheduleEmail { .. } => "schedule_email",
            Self::AddTag { .. } => "add_tag",
            Self::RemoveTag { .. } => "remove_tag",
            Self::ChangeStatus { .. } => "change_status",
            Self::CreateTask { .. } => "create_task",
            Self::CreateInteraction { .. } => "create_interaction",
            Self::Webhook { .. } => "webhook",
            Self::SendSms => "send_sms",
        }
    }

    /// Whether dispatching this action needs a customer snapshot on the
    /// event context.
    pub fn needs_customer(&self) -> bool {
        !matches!(self, Self::Webhook { .. } | Self::SendSms)
    }
}

/// Result of dispatching one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl ActionOutcome {
    pub fn success(action: &WorkflowAction, detail: Option<serde_json::Value>) -> Self {
        Self {
            action_type: action.kind().to_string(),
            success: true,
            detail,
            error: None,
            duration_ms: 0,
        }
    }

    /// A skipped side effect recorded as success, e.g. when the event
    /// context carries no customer for a customer-scoped action.
    pub fn noop(action: &WorkflowAction, reason: &str) -> Self {
        Self::success(action, Some(serde_json::json!({ "noop": reason })))
    }

    pub fn failure(action: &WorkflowAction, error: &str) -> Self {
        Self {
            action_type: action.kind().to_string(),
            success: false,
            detail: None,
            error: Some(error.to_string()),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let action = WorkflowAction::AddTag {
            tag_name: "new-lead".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "add_tag");
        assert_eq!(json["tag_name"], "new-lead");

        let parsed: WorkflowAction = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let action = WorkflowAction::CreateTask {
            task_title: "Call back".to_string(),
            task_description: None,
            due_days: None,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("task_description").is_none());
        assert!(json.get("due_days").is_none());
    }

    #[test]
    fn test_kind_matches_tag() {
        let action = WorkflowAction::ScheduleEmail {
            template_id: Uuid::new_v4(),
            delay_days: 3,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], action.kind());
    }

    #[test]
    fn test_outcome_constructors() {
        let action = WorkflowAction::SendSms;
        let ok = ActionOutcome::noop(&action, "sms channel not implemented");
        assert!(ok.success);
        assert_eq!(ok.action_type, "send_sms");

        let failed = ActionOutcome::failure(&action, "transport down");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("transport down"));
    }
}
