use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::mock_db::MockDb,
    models::user::{Identity, User, UserRole},
    services::{refresh_store::InMemoryRefreshTokenStore, token_service::TokenService},
    state::AppState,
    utils::password::hash_password,
};

pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub fn app_state(db: Arc<MockDb>) -> AppState {
    AppState {
        db: db.clone(),
        crm: db,
        tokens: Arc::new(TokenService::for_tests(Arc::new(
            InMemoryRefreshTokenStore::new(),
        ))),
    }
}

pub fn identity(role: UserRole) -> Identity {
    Identity {
        subject_id: Uuid::new_v4(),
        email: format!("{role}@example.com"),
        display_name: format!("Test {role}"),
        role,
    }
}

/// An active user whose password is [`TEST_PASSWORD`].
pub fn user(email: &str, role: UserRole) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.into(),
        password_hash: hash_password(TEST_PASSWORD).unwrap(),
        first_name: "Test".into(),
        last_name: role.to_string(),
        role,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub async fn bearer_for(state: &AppState, identity: &Identity) -> String {
    let pair = state.tokens.issue(identity).await.unwrap();
    format!("Bearer {}", pair.access_token)
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(res: Response) -> (StatusCode, Value) {
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
