use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Field name -> validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Every failure leaves the server as `{"status": "error", "message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(FieldErrors),
    NotFound(String),
    PayloadTooLarge(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let message = format!("Multipart error: {}", err.body_text());
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": message }),
            ),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": "error", "message": "Invalid data", "errors": errors }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "status": "error", "message": message }),
            ),
            ApiError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "status": "error", "message": message }),
            ),
            ApiError::Internal(err) => {
                let detail = format!("{err:#}");
                error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": "error", "message": err.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
