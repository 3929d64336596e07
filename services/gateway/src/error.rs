use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{
    mirror::MirrorError,
    provider::ProviderError,
    push::PushError,
    store::StoreError,
    submitter::SubmitError,
};

/// Every failure a handler can return, mapped to one status code and one
/// JSON body shape.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<String>),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Detail stays in the server log.
    Configuration(String),
    Provider(String),
    Internal(String),
    MethodNotAllowed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "errors": errors }),
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "success": false, "error": msg }))
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, json!({ "success": false, "error": msg }))
            }
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, json!({ "success": false, "error": msg }))
            }
            ApiError::Configuration(detail) => {
                error!(%detail, "gateway: configuration fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Server misconfiguration" }),
                )
            }
            ApiError::Provider(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": msg }),
            ),
            ApiError::Internal(detail) => {
                error!(%detail, "gateway: internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal server error" }),
                )
            }
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "success": false, "error": "Method not allowed" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Configuration(detail) => ApiError::Configuration(detail),
            SubmitError::Provider(ProviderError::Rejected {
                status,
                status_text,
                body,
            }) => {
                error!(status, %body, "gateway: provider rejected build");
                ApiError::Provider(format!("Failed to start build: {status_text}"))
            }
            SubmitError::Provider(other) => {
                error!(error = %other, "gateway: provider call failed");
                ApiError::Provider("Failed to start build: build provider unavailable".into())
            }
            SubmitError::Store(e) => e.into(),
        }
    }
}

impl From<MirrorError> for ApiError {
    fn from(e: MirrorError) -> Self {
        match e {
            MirrorError::NotFound(_) => ApiError::NotFound("Build not found".into()),
            MirrorError::Store(e) => e.into(),
        }
    }
}

impl From<PushError> for ApiError {
    fn from(e: PushError) -> Self {
        match e {
            PushError::Validation(msg) | PushError::Delivery(msg) => ApiError::BadRequest(msg),
            PushError::Transport(detail) => {
                error!(%detail, "gateway: push service unreachable");
                ApiError::Provider("Failed to send notification".into())
            }
        }
    }
}
