// Customer record updates issued by workflow actions

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::NewInteraction;
use crate::workflows::dispatcher::CustomerStore;
use crate::workflows::BoxError;

#[derive(Clone)]
pub struct CustomerService {
    db_pool: PgPool,
}

impl CustomerService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CustomerStore for CustomerService {
    async fn add_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE customers
             SET tags = array_append(tags, $2), updated_at = NOW()
             WHERE id = $1 AND NOT ($2 = ANY(tags))",
        )
        .bind(customer_id)
        .bind(tag)
        .execute(&self.db_pool)
        .await?;

        let added = result.rows_affected() > 0;
        debug!("Tag '{}' on customer {}: added={}", tag, customer_id, added);
        Ok(added)
    }

    async fn remove_tag(&self, customer_id: Uuid, tag: &str) -> Result<bool, BoxError> {
        let result = sqlx::query(
            "UPDATE customers
             SET tags = array_remove(tags, $2), updated_at = NOW()
             WHERE id = $1 AND $2 = ANY(tags)",
        )
        .bind(customer_id)
        .bind(tag)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, customer_id: Uuid, status: &str) -> Result<(), BoxError> {
        sqlx::query("UPDATE customers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(customer_id)
            .bind(status)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    async fn append_interaction(
        &self,
        customer_id: Uuid,
        interaction: NewInteraction,
    ) -> Result<Uuid, BoxError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO customer_interactions
             (id, customer_id, direction, source, notes, occurred_at)
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(id)
        .bind(customer_id)
        .bind(&interaction.direction)
        .bind(&interaction.source)
        .bind(&interaction.notes)
        .execute(&self.db_pool)
        .await?;
        Ok(id)
    }
}
