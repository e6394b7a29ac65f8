use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use likely_common::LikelyError;
use tracing::error;

/// An HTTP error response: status plus `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Actor with id {id} not found."))
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
    }
}

impl From<LikelyError> for ApiError {
    fn from(err: LikelyError) -> Self {
        match err {
            LikelyError::SelfAction(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "Actor can only like/unlike other actors.",
            ),
            LikelyError::Conflict { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                "Cannot like/unlike actor multiple times.",
            ),
            LikelyError::TargetNotFound(id) => Self::not_found(id),
            // Logged where it happened; details stay out of the body.
            LikelyError::Storage(_) => Self::internal(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "Storage failure");
        Self::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response =
            (self.status, Json(serde_json::json!({ "error": self.message }))).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
