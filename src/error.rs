//! Unified API error handling
//!
//! Provides consistent error responses across all endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{BomError, ProgressError, ProjectError, TemplateError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            // Don't leak internal error details
            Self::Internal(_) | Self::Database(_) => "An internal error occurred".to_string(),
        }
    }
}

impl From<BomError> for ApiError {
    fn from(err: BomError) -> Self {
        match err {
            BomError::TemplateNotFound(_) | BomError::LocationNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            BomError::InvalidBom
            | BomError::InvalidParameters(_)
            | BomError::DegenerateTemplate(_) => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::FloorNotFound(_) => Self::NotFound(err.to_string()),
            ProgressError::InvalidStatusTransition { .. } => Self::Conflict(err.to_string()),
            ProgressError::FloorAlreadyAutomatic(_) | ProgressError::InvalidProgress(_) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<ProjectError> for ApiError {
    fn from(err: ProjectError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<TemplateError> for ApiError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::CategoryNotFound(_) | TemplateError::MaterialNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log internal errors
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "Database error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            request_id: None, // Will be populated by middleware if available
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectStatus;
    use uuid::Uuid;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let missing: ApiError = BomError::TemplateNotFound(Uuid::nil()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let invalid: ApiError = BomError::InvalidBom.into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let transition: ApiError = ProgressError::InvalidStatusTransition {
            from: ProjectStatus::Finished,
            to: "ongoing".to_string(),
        }
        .into();
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);

        let category: ApiError = TemplateError::CategoryNotFound("Roofing".to_string()).into();
        assert_eq!(category.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
