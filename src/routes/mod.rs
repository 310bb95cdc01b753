pub mod auth;
pub mod dashboard;
pub mod reports;
pub mod tasks;
pub mod users;

use axum::{
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;

use crate::{responses::JsonResponse, state::AppState};

/// Every route, with state applied. Transport layers (CORS, tracing, rate
/// limiting) are added by the binary.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::handle_login))
        .route("/refresh", post(auth::handle_refresh))
        .route("/logout", post(auth::handle_logout))
        .route("/me", get(auth::handle_me));

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard::dashboard_stats))
        .route("/activity", get(dashboard::dashboard_activity));

    let report_routes = Router::new()
        .route("/tasks", get(reports::task_report))
        .route("/leads", get(reports::lead_report));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/reports", report_routes)
        .route("/api/tasks/{id}", put(tasks::update_task))
        .route("/api/users/{id}", delete(users::delete_user))
        .with_state(state)
}

async fn root() -> Response {
    JsonResponse::message("CRM backend is running")
}

async fn health() -> Response {
    JsonResponse::success(json!({ "status": "ok" }))
}
