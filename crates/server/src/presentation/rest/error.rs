use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::SubmitOrderError;
use crate::presentation::rest::dto::ErrorResponse;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<SubmitOrderError> for ApiError {
    fn from(err: SubmitOrderError) -> Self {
        match err {
            SubmitOrderError::Invalid(e) => Self::bad_request(e.to_string()),
        }
    }
}

/// Every body the order endpoint cannot decode is a client error
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}
