// Task creation on behalf of workflow actions

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::NewTask;
use crate::workflows::dispatcher::TaskStore;
use crate::workflows::BoxError;

#[derive(Clone)]
pub struct TaskService {
    db_pool: PgPool,
}

impl TaskService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TaskStore for TaskService {
    async fn create_task(&self, task: NewTask) -> Result<Uuid, BoxError> {
        let id = Uuid::new_v4();
        // Priority and status fall through to the table defaults.
        sqlx::query(
            "INSERT INTO tasks
             (id, user_id, title, description, related_to, related_id, due_date, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())",
        )
        .bind(id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.related_to)
        .bind(task.related_id)
        .bind(task.due_date)
        .execute(&self.db_pool)
        .await?;
        Ok(id)
    }
}
