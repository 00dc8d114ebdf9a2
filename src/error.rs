// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::quiz::machine::MachineError;
use crate::quiz::store::SessionError;
use crate::registrar::RegistrationError;
use crate::repos::participants::StoreError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate participant, invalid transition)
    Conflict(String),

    // 503: the backing store is missing, broken or unreachable
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Session and state-machine rejections. Invalid transitions are interface
/// guards, so they map to 4xx rather than 500.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => {
                AppError::NotFound("Session not found or expired".to_string())
            }
            SessionError::NotFinished => {
                AppError::Conflict("Quiz is not finished yet".to_string())
            }
            SessionError::Machine(MachineError::InvalidOption) => {
                AppError::BadRequest("Selected option does not exist".to_string())
            }
            SessionError::Machine(MachineError::EmptyBank) => {
                AppError::ServiceUnavailable("No questions are configured".to_string())
            }
            SessionError::Machine(MachineError::AlreadyStarted) => {
                AppError::Conflict("Quiz is already in progress".to_string())
            }
            SessionError::Machine(MachineError::NotInProgress) => {
                AppError::Conflict("Quiz is not in progress".to_string())
            }
        }
    }
}

/// One inline message per registration error kind; raw storage errors are
/// logged here and never shown to end users.
impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Duplicate => AppError::Conflict(
                "This email or phone number has already participated".to_string(),
            ),
            RegistrationError::StorageMisconfigured => {
                tracing::error!("participants storage is misconfigured");
                AppError::ServiceUnavailable(
                    "Registration is temporarily unavailable, please try later".to_string(),
                )
            }
            RegistrationError::PermissionDenied => {
                tracing::error!("storage rejected the write: permission denied");
                AppError::ServiceUnavailable(
                    "Registration is temporarily unavailable, please try later".to_string(),
                )
            }
            RegistrationError::StorageUnavailable(msg) => {
                tracing::warn!("storage unavailable during registration: {}", msg);
                AppError::ServiceUnavailable(
                    "Registration is temporarily unavailable, please try again shortly"
                        .to_string(),
                )
            }
            RegistrationError::Unknown(msg) => AppError::InternalServerError(msg),
        }
    }
}

/// Read-side storage failures (leaderboard queries).
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TableMissing | StoreError::PermissionDenied => {
                tracing::error!("leaderboard storage error: {}", err);
                AppError::ServiceUnavailable(
                    "Leaderboard is temporarily unavailable".to_string(),
                )
            }
            StoreError::Unavailable(msg) => {
                tracing::warn!("storage unavailable during leaderboard read: {}", msg);
                AppError::ServiceUnavailable(
                    "Leaderboard is temporarily unavailable".to_string(),
                )
            }
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}
