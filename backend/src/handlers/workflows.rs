// Workflow management and event intake endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, AppError};
use crate::workflows::{
    ExecutionLogEntry, ExecutionLogFilter, ExecutionStatus, NewWorkflow, TriggerType, Workflow,
    WorkflowUpdate,
};
use crate::AppState;

/// The authenticated-user layer is out of scope; callers identify
/// themselves explicitly on every request.
#[derive(Debug, Deserialize)]
pub struct UserScope {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionQuery {
    pub user_id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub status: Option<ExecutionStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
    pub user_id: Uuid,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub context: serde_json::Value,
}

pub fn workflow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_workflows).post(create_workflow))
        .route(
            "/:id",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/:id/toggle", post(toggle_workflow))
        .route("/seed", post(seed_workflows))
        .route("/executions", get(list_executions))
        .route("/trigger", post(trigger_event))
}

async fn list_workflows(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> ApiResult<Json<Vec<Workflow>>> {
    let workflows = state.registry.list(scope.user_id).await?;
    Ok(Json(workflows))
}

async fn create_workflow(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<NewWorkflow>,
) -> ApiResult<(StatusCode, Json<Workflow>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Workflow name is required".to_string()));
    }

    let workflow = state.registry.create(scope.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<UserScope>,
) -> ApiResult<Json<Workflow>> {
    state
        .registry
        .get(scope.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Workflow".to_string()))
}

async fn update_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<WorkflowUpdate>,
) -> ApiResult<Json<Workflow>> {
    state
        .registry
        .update(scope.user_id, id, payload)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Workflow".to_string()))
}

async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<UserScope>,
) -> ApiResult<StatusCode> {
    if state.registry.delete(scope.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Workflow".to_string()))
    }
}

async fn toggle_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(scope): Query<UserScope>,
    Json(payload): Json<ToggleBody>,
) -> ApiResult<Json<Workflow>> {
    state
        .registry
        .set_active(scope.user_id, id, payload.is_active)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Workflow".to_string()))
}

async fn seed_workflows(
    State(state): State<Arc<AppState>>,
    Query(scope): Query<UserScope>,
) -> ApiResult<Json<serde_json::Value>> {
    let created = state.registry.seed_starters(scope.user_id).await?;
    Ok(Json(json!({ "created": created })))
}

async fn list_executions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExecutionQuery>,
) -> ApiResult<Json<Vec<ExecutionLogEntry>>> {
    let filter = ExecutionLogFilter {
        workflow_id: params.workflow_id,
        status: params.status,
    };
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let entries = state
        .execution_logs
        .list_for_user(params.user_id, &filter, limit)
        .await?;
    Ok(Json(entries))
}

/// Accept a business event and route it to matching workflows in the
/// background. Responds before any workflow runs; outcomes are observable
/// through the execution log.
async fn trigger_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TriggerBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let router = state.trigger_router.clone();
    tokio::spawn(async move {
        router
            .route(payload.user_id, payload.trigger_type, payload.context)
            .await;
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
