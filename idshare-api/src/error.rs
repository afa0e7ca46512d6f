//! API error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use idshare_core::core_disclosure::DisclosureError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error(transparent)]
    Disclosure(#[from] DisclosureError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<&'static str, Vec<String>>>,
}

impl ErrorResponse {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ApiError::Disclosure(e) => match e {
                DisclosureError::Unauthenticated => StatusCode::UNAUTHORIZED,
                DisclosureError::NotFound { .. } => StatusCode::NOT_FOUND,
                DisclosureError::Forbidden { .. } => StatusCode::FORBIDDEN,
                DisclosureError::Validation(_) => StatusCode::BAD_REQUEST,
                DisclosureError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::AuthenticationFailed => ErrorResponse::message("Invalid username or password."),
            ApiError::Disclosure(DisclosureError::Unauthenticated) => {
                ErrorResponse::message("Authentication credentials were not provided.")
            }
            // Absent and out-of-scope look the same from outside
            ApiError::Disclosure(DisclosureError::NotFound { .. }) => ErrorResponse::message("Not found."),
            ApiError::Disclosure(DisclosureError::Forbidden { reason }) => ErrorResponse::message(reason),
            ApiError::Disclosure(DisclosureError::Validation(errors)) => ErrorResponse {
                error: "Invalid input.".to_string(),
                fields: Some(errors.by_field()),
            },
            ApiError::Disclosure(DisclosureError::Storage(message)) | ApiError::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                ErrorResponse::message("Internal server error.")
            }
        };

        (status, Json(body)).into_response()
    }
}
