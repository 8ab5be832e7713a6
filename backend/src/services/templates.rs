// Template resolution and `{{path}}` variable substitution

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::models::EmailTemplate;
use crate::workflows::{BoxError, TemplateStore};

fn placeholder_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").expect("static pattern"))
}

/// Replace `{{field.path}}` placeholders with values resolved against the
/// event context. Unresolvable placeholders are left untouched so a bad
/// template is visible in the output rather than silently blanked.
pub fn substitute_variables(template: &str, context: &serde_json::Value) -> String {
    let mut result = template.to_string();

    for cap in placeholder_re().captures_iter(template) {
        let path = &cap[1];
        let Some(value) = lookup(context, path) else {
            continue;
        };

        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        };
        result = result.replace(&cap[0], &replacement);
    }

    result
}

fn lookup<'a>(context: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = context;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    match current {
        serde_json::Value::Null => None,
        value => Some(value),
    }
}

/// Postgres-backed email template resolution.
#[derive(Clone)]
pub struct TemplateService {
    db_pool: PgPool,
}

impl TemplateService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TemplateStore for TemplateService {
    async fn template_by_id(
        &self,
        user_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<EmailTemplate>, BoxError> {
        let template = sqlx::query_as::<_, EmailTemplate>(
            "SELECT id, user_id, name, subject, body, created_at, updated_at
             FROM email_templates
             WHERE id = $1 AND user_id = $2",
        )
        .bind(template_id)
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(template)
    }
}
