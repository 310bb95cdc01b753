use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::Response,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    errors::{ensure_allowed, ApiError},
    models::crm::TaskUpdate,
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::authorization::{decide, Action, Resource, ResourceKind},
    state::AppState,
};

/// Partial update of a task. Plain users may only touch tasks assigned to
/// them; managers and admins may update any task.
pub async fn update_task(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
    task_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(task_id) = task_id?;
    let Json(update) = payload?;

    let task = app_state
        .crm
        .find_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    ensure_allowed(decide(
        &identity,
        Action::Update,
        Resource::owned_by(ResourceKind::Task, task.assigned_to),
    ))?;

    if update.is_empty() {
        return Err(ApiError::ValidationFailed("No fields to update".to_string()));
    }
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::ValidationFailed(
            "Title cannot be empty".to_string(),
        ));
    }

    let updated = app_state
        .crm
        .update_task(task_id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    info!(%task_id, user_id = %identity.subject_id, "task updated");
    Ok(JsonResponse::success(updated))
}
