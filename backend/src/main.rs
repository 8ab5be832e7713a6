use axum::{
    http::Method,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod error;
mod handlers;
mod models;
mod services;
mod storage;
mod workflows;

pub use error::{ApiError, ApiResult, AppError};

use services::{CustomerService, EmailService, TaskService, TemplateService};
use storage::{PgExecutionLogStore, PgWorkflowStore};
use workflows::{ActionDispatcher, ExecutionLogStore, TriggerRouter, WorkflowRegistry};

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub registry: WorkflowRegistry,
    pub execution_logs: Arc<dyn ExecutionLogStore>,
    pub trigger_router: Arc<TriggerRouter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url).await?;

    database::run_migrations(&db_pool).await?;

    if !config.smtp.is_configured() {
        tracing::warn!("SMTP is not configured; send_email actions will fail until it is");
    }

    let templates = Arc::new(TemplateService::new(db_pool.clone()));
    let mailer = Arc::new(
        EmailService::new(&config.smtp, db_pool.clone())
            .map_err(|e| anyhow::anyhow!("SMTP transport setup failed: {e}"))?,
    );
    let customers = Arc::new(CustomerService::new(db_pool.clone()));
    let tasks = Arc::new(TaskService::new(db_pool.clone()));

    let registry = WorkflowRegistry::new(Arc::new(PgWorkflowStore::new(db_pool.clone())));
    let execution_logs: Arc<dyn ExecutionLogStore> =
        Arc::new(PgExecutionLogStore::new(db_pool.clone()));
    let dispatcher = ActionDispatcher::new(templates, mailer, customers, tasks);
    let trigger_router = Arc::new(TriggerRouter::new(
        registry.clone(),
        execution_logs.clone(),
        dispatcher,
        config.workflow_timeouts,
    ));

    let app_state = Arc::new(AppState {
        db_pool,
        registry,
        execution_logs,
        trigger_router,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(|| async { "KennelFlow API v1.0.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1/workflows", handlers::workflow_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
