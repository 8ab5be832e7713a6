// Outbound email: immediate SMTP delivery plus the deferred-send queue

use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::workflows::dispatcher::{Mailer, OutgoingEmail, ScheduledEmail};
use crate::workflows::BoxError;

#[derive(Clone)]
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    db_pool: PgPool,
    from_email: String,
    from_name: String,
}

impl EmailService {
    pub fn new(smtp_config: &SmtpConfig, db_pool: PgPool) -> Result<Self, BoxError> {
        let creds = Credentials::new(
            smtp_config.username.clone(),
            smtp_config.password.clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_config.host)
            .port(smtp_config.port)
            .credentials(creds)
            .pool_config(PoolConfig::new().max_size(10))
            .timeout(Some(Duration::from_secs(10)))
            .build();

        Ok(EmailService {
            transport,
            db_pool,
            from_email: smtp_config.from_email.clone(),
            from_name: smtp_config.from_name.clone(),
        })
    }

    async fn send(&self, to_email: &str, subject: &str, body: &str) -> Result<(), BoxError> {
        let from = format!("{} <{}>", self.from_name, self.from_email).parse::<Mailbox>()?;
        let to = to_email.parse::<Mailbox>()?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())?;

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email sent successfully to {}", to_email);
                Ok(())
            }
            Err(e) => {
                error!("Failed to send email to {}: {}", to_email, e);
                Err(Box::new(e))
            }
        }
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_now(&self, email: OutgoingEmail) -> Result<(), BoxError> {
        self.send(&email.to, &email.subject, &email.body).await
    }

    /// Enqueue an email for later delivery. The queue is drained by an
    /// external delivery job, not by this service.
    async fn schedule(&self, email: ScheduledEmail) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO scheduled_emails
             (id, user_id, customer_id, to_address, subject, body, source, scheduled_for, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(email.user_id)
        .bind(email.customer_id)
        .bind(&email.to)
        .bind(&email.subject)
        .bind(&email.body)
        .bind(&email.source)
        .bind(email.scheduled_for)
        .execute(&self.db_pool)
        .await?;

        info!(
            "Email to {} scheduled for {}",
            email.to, email.scheduled_for
        );
        Ok(())
    }
}
