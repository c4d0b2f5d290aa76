//! Centralized error types for the Candor core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::media::MediaError;
use crate::store::StoreError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for MediaError {
    fn code(&self) -> &'static str {
        match self {
            Self::FrameDecode(_) => "frame_decode_failed",
            Self::EmptyFrame => "empty_frame",
            Self::BadAudio(_) => "bad_audio_payload",
        }
    }
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "store_backend_error",
            Self::Conflict(_) => "store_conflict",
        }
    }
}

/// Application-wide error type for the Candor engine.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CandorError {
    /// Requested session is not registered.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session with this id already has an active scheduler.
    #[error("Session already running: {0}")]
    SessionAlreadyRunning(String),

    /// Requested job role does not exist.
    #[error("Job role not found: {0}")]
    JobRoleNotFound(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Persistence backend failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Internal engine error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Engine configuration error (invalid cadence/capacity settings).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CandorError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionAlreadyRunning(_) => "session_already_running",
            Self::JobRoleNotFound(_) => "job_role_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) | Self::JobRoleNotFound(_) => StatusCode::NOT_FOUND,
            Self::SessionAlreadyRunning(_) => StatusCode::CONFLICT,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for engine-wide operations.
pub type CandorResult<T> = Result<T, CandorError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for CandorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<MediaError> for CandorError {
    fn from(err: MediaError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<StoreError> for CandorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}
