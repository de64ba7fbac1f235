use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{auth::AuthError, db::DbError, services::ServiceError};

/// Error body for every API failure: `{"error": "<KIND>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    Forbidden,
    NotFound,
    ParentNotFound,
    Validation(String),
    Database(DbError),
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::ParentNotFound => "PARENT_NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound | ApiError::ParentNotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound => ApiError::NotFound,
            ServiceError::Forbidden => ApiError::Forbidden,
            ServiceError::ParentNotFound => ApiError::ParentNotFound,
            ServiceError::Validation(msg) => ApiError::Validation(msg),
            ServiceError::Database(DbError::NotFound) => ApiError::NotFound,
            ServiceError::Database(err) => ApiError::Database(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => ApiError::Internal(msg),
            other => {
                tracing::debug!(error = %other, "Rejected unauthenticated request");
                ApiError::Unauthenticated
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Database error");
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
            }
            ApiError::Validation(msg) => {
                tracing::debug!(reason = %msg, "Validation failed");
            }
            _ => {}
        }

        (self.status(), Json(ErrorBody { error: self.kind() })).into_response()
    }
}
