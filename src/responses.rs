use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of every successful response: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessBody<T> {
    pub success: bool,
    pub data: T,
}

/// Body of every failed response: `{"success": false, "error": ..., "code": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageData {
    pub message: String,
}

pub struct JsonResponse;

impl JsonResponse {
    pub fn success<T: Serialize>(data: T) -> Response {
        (
            StatusCode::OK,
            Json(SuccessBody {
                success: true,
                data,
            }),
        )
            .into_response()
    }

    pub fn message(msg: &str) -> Response {
        Self::success(MessageData {
            message: msg.to_string(),
        })
    }

    pub fn error(status: StatusCode, msg: &str, code: &str) -> Response {
        (
            status,
            Json(ErrorBody {
                success: false,
                error: msg.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }

    pub fn too_many_requests(msg: &str) -> Response {
        Self::error(StatusCode::TOO_MANY_REQUESTS, msg, "RATE_LIMITED")
    }
}
