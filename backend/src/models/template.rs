// Email templates authored by the user, referenced by email actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Subject and body may contain `{{path}}` placeholders resolved
    /// against the event context at send time.
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
