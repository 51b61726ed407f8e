use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::convert::ConvertError;
use common::storage::UploadError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::response::code;

/// Envelope returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code, e.g. `1002` invalid params, `2001` user exists,
    /// `3011` file too large, `4011` view limit exceeded.
    #[schema(example = 1002)]
    pub code: i32,
    /// Human-readable error description.
    #[schema(example = "Role must be 1-64 characters")]
    pub message: String,
    /// Always `null` on failure.
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
}

impl ErrorBody {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    ResumeNotFound,
    UserNotFound,
    UserAlreadyExists,
    InvalidCredentials,
    InvalidToken,
    TokenExpired,
    UserDisabled,
    /// Unknown or expired upload key, or a stored file that is gone.
    FileNotFound,
    Conflict(String),
    FileTooLarge {
        limit: u64,
    },
    /// Access limit reached. Contains seconds until the window resets.
    ViewLimitExceeded {
        retry_after: u64,
    },
    ConverterUnavailable,
    ConversionFailed,
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(code::INVALID_PARAMS, msg),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code::UNAUTHORIZED, "Authentication required"),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(code::FORBIDDEN, "Access denied"),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(code::NOT_FOUND, msg),
            ),
            AppError::ResumeNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(code::DATA_NOT_FOUND, "Resume not found"),
            ),
            AppError::UserNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(code::USER_NOT_FOUND, "User not found"),
            ),
            AppError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                ErrorBody::new(code::USER_ALREADY_EXISTS, "User already exists"),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code::INVALID_CREDENTIALS, "Invalid email or password"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code::INVALID_TOKEN, "Invalid token"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new(code::TOKEN_EXPIRED, "Token expired"),
            ),
            AppError::UserDisabled => (
                StatusCode::FORBIDDEN,
                ErrorBody::new(code::USER_DISABLED, "User is disabled"),
            ),
            AppError::FileNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(code::DATA_NOT_FOUND, "File not found or expired"),
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody::new(code::DATA_ALREADY_EXISTS, msg),
            ),
            AppError::FileTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody::new(
                    code::DATA_TOO_LARGE,
                    format!("File exceeds the size limit of {limit} bytes"),
                ),
            ),
            AppError::ViewLimitExceeded { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::new(
                    code::LIMIT_EXCEEDED,
                    format!("View limit exceeded. Try again in {retry_after} seconds"),
                ),
            ),
            AppError::ConverterUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody::new(code::SERVICE_UNAVAILABLE, "PDF converter unavailable"),
            ),
            AppError::ConversionFailed => (
                StatusCode::BAD_GATEWAY,
                ErrorBody::new(code::DEPENDENCY_FAILED, "PDF conversion failed"),
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(code::INTERNAL_ERROR, "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::ViewLimitExceeded { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::FileTooLarge { limit } => AppError::FileTooLarge { limit },
            UploadError::InvalidFileType(msg) => AppError::Validation(msg),
            UploadError::InvalidPath(_) | UploadError::NotFound(_) => AppError::FileNotFound,
            UploadError::Io(e) => AppError::Internal(format!("Upload IO error: {e}")),
        }
    }
}

impl From<ConvertError> for AppError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::ConverterUnavailable => {
                tracing::warn!("No PDF converter available");
                AppError::ConverterUnavailable
            }
            ConvertError::ConversionFailed(detail) => {
                tracing::warn!("PDF conversion failed: {detail}");
                AppError::ConversionFailed
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Render a caught handler panic as the internal-error envelope.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("Handler panicked: {detail}")).into_response()
}
