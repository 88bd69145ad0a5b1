//! # API Errors
//!
//! Every handler failure ends up as one of these variants and is rendered as
//! a JSON body with an `error` key.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::data_service::DataServiceError;

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Generic message of unexpected failures
pub const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Required input missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Expected record absent
    #[error("{0}")]
    NotFound(String),

    /// Conditional update lost to concurrent writers
    #[error("{0}")]
    Conflict(String),

    /// The data service reported an error
    #[error("{0}")]
    DataService(String),

    /// Anything else
    #[error("Server error: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DataService(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a data service failure, replacing the message of errors the
    /// service itself reported. Transport and decoding failures stay
    /// unexpected.
    pub fn data_service(err: DataServiceError, message: &str) -> Self {
        if err.is_api() {
            ApiError::DataService(message.to_string())
        } else {
            ApiError::from(err)
        }
    }
}

impl From<DataServiceError> for ApiError {
    fn from(err: DataServiceError) -> Self {
        if err.is_api() {
            ApiError::DataService(err.message())
        } else {
            ApiError::Unexpected(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Unexpected(details) => Self {
                error: SERVER_ERROR.to_string(),
                details: Some(details.clone()),
            },
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::DataService(msg) => Self {
                error: msg.clone(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::from(&self));
        (self.status_code(), body).into_response()
    }
}
