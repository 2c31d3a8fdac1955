//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    NoCopiesAvailable = 5,
    AlreadyReturned = 6,
    RenewalNotAllowed = 7,
    CopiesAvailable = 8,
    InvalidState = 9,
    DuplicateFine = 10,
    AlreadyPaid = 11,
    Duplicate = 12,
    BadValue = 13,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No copies available for book {0}")]
    NoCopiesAvailable(i64),

    #[error("Issue {0} has already been returned")]
    AlreadyReturned(i64),

    #[error("Renewal not allowed: {0}")]
    RenewalNotAllowed(String),

    #[error("Book {0} still has available copies, issue it directly")]
    CopiesAvailable(i64),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("A paid fine already exists for issue {0}")]
    DuplicateFine(i64),

    #[error("Fine {0} is already paid")]
    AlreadyPaid(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NoCopiesAvailable(_) => ErrorCode::NoCopiesAvailable,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::RenewalNotAllowed(_) => ErrorCode::RenewalNotAllowed,
            AppError::CopiesAvailable(_) => ErrorCode::CopiesAvailable,
            AppError::InvalidState(_) => ErrorCode::InvalidState,
            AppError::DuplicateFine(_) => ErrorCode::DuplicateFine,
            AppError::AlreadyPaid(_) => ErrorCode::AlreadyPaid,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::DbFailure,
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::AlreadyReturned(_)
            | AppError::DuplicateFine(_)
            | AppError::AlreadyPaid(_) => StatusCode::CONFLICT,
            AppError::NoCopiesAvailable(_)
            | AppError::RenewalNotAllowed(_)
            | AppError::CopiesAvailable(_)
            | AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Migration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
