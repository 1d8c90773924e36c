// src/web/error.rs
// HTTP error responses for the relay API

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::{error, warn};

use crate::error::ChatError;

/// Error returned by every JSON handler
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Status for a core error
pub fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::UpstreamUnavailable(_) | ChatError::UpstreamStatus { .. } | ChatError::Media(_) => {
            StatusCode::BAD_GATEWAY
        }
        ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChatError::SessionNotFound(_) | ChatError::PersonaNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        ChatError::Io(_) | ChatError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status_code = status_for(&err);
        if status_code.is_server_error() {
            error!(error = %err, status = status_code.as_u16(), "Request failed");
        } else {
            warn!(error = %err, status = status_code.as_u16(), "Request rejected");
        }
        Self {
            message: err.to_string(),
            status_code,
        }
    }
}

/// Malformed or incomplete JSON bodies keep axum's status (400, 415 or 422)
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = rejection.status().as_u16(), "Rejected request body");
        Self {
            message: rejection.body_text(),
            status_code: rejection.status(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(status = rejection.status().as_u16(), "Rejected query string");
        Self {
            message: rejection.body_text(),
            status_code: rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code, Json(json!({ "message": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ChatError::UpstreamStatus { status: 401, body: String::new() }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_for(&ChatError::Media("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&ChatError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&ChatError::SessionNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&ChatError::Config("x".into())), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::from(ChatError::InvalidInput("empty".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
