use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    errors::{ensure_allowed, ApiError},
    models::{crm::Scope, user::UserRole},
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::{
        aggregation::{compute_lead_report, compute_task_report},
        authorization::require_role,
    },
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Restrict the report to one user's records.
    pub owner_id: Option<Uuid>,
}

impl ReportQuery {
    fn scope(&self) -> Scope {
        self.owner_id.map_or(Scope::All, Scope::Owner)
    }
}

pub async fn task_report(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    ensure_allowed(require_role(&identity, UserRole::Manager))?;
    let Query(query) = query?;

    let report = compute_task_report(app_state.crm.as_ref(), query.scope(), Utc::now()).await?;
    Ok(JsonResponse::success(report))
}

pub async fn lead_report(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    ensure_allowed(require_role(&identity, UserRole::Manager))?;
    let Query(query) = query?;

    let report = compute_lead_report(app_state.crm.as_ref(), query.scope(), Utc::now()).await?;
    Ok(JsonResponse::success(report))
}
