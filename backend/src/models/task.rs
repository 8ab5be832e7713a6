// Task records created by workflow actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task to create. Priority and status are left to the task collaborator's
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub related_to: String,
    pub related_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn for_customer(
        user_id: Uuid,
        customer_id: Uuid,
        title: String,
        description: Option<String>,
        due_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            title,
            description,
            related_to: "customer".to_string(),
            related_id: Some(customer_id),
            due_date,
        }
    }
}
