//! Port Check Error Types
//!
//! This module provides port-check-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::rate_limit::RateLimitError;
use thiserror::Error;

/// Port-check-specific result type alias
pub type PortCheckResult<T> = Result<T, PortCheckError>;

/// Terminal outcomes of a check other than a probe result
///
/// An unreachable port is not an error; it is a normal "closed" outcome.
/// Audit log failures never appear here either.
#[derive(Debug, Error)]
pub enum PortCheckError {
    /// No usable client address
    #[error("Client address could not be determined")]
    InvalidIdentifier,

    /// Caller exceeded its quota for the current window
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Human verification failed
    #[error("Invalid reCAPTCHA")]
    CaptchaInvalid,

    /// Port missing, not a number, or outside 1..=65535
    #[error("Invalid port: {0:?}")]
    InvalidPort(String),
}

impl PortCheckError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortCheckError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PortCheckError::CaptchaInvalid | PortCheckError::InvalidPort(_) => {
                StatusCode::BAD_REQUEST
            }
            PortCheckError::InvalidIdentifier => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortCheckError::RateLimited { .. } => ErrorKind::TooManyRequests,
            PortCheckError::CaptchaInvalid | PortCheckError::InvalidPort(_) => {
                ErrorKind::BadRequest
            }
            PortCheckError::InvalidIdentifier => ErrorKind::InternalServerError,
        }
    }

    /// Plain-text body returned to the caller
    fn public_message(&self) -> &'static str {
        match self {
            PortCheckError::RateLimited { .. } => "Too many requests",
            PortCheckError::CaptchaInvalid => "Invalid reCAPTCHA",
            PortCheckError::InvalidPort(_) => "Invalid port",
            PortCheckError::InvalidIdentifier => "Internal Server Error",
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            _ if self.kind().is_server_error() => {
                tracing::error!(error = %self, "Port check failed");
            }
            PortCheckError::RateLimited { retry_after } => {
                tracing::warn!(retry_after_secs = retry_after.as_secs(), "Port check rate limited");
            }
            _ => {
                tracing::debug!(error = %self, "Port check rejected");
            }
        }
    }
}

impl From<PortCheckError> for AppError {
    fn from(err: PortCheckError) -> Self {
        let app_err = AppError::new(err.kind(), err.public_message());
        match err {
            PortCheckError::RateLimited { retry_after } => app_err.with_retry_after(retry_after),
            _ => app_err,
        }
    }
}

impl IntoResponse for PortCheckError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

impl From<RateLimitError> for PortCheckError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::InvalidIdentifier => PortCheckError::InvalidIdentifier,
        }
    }
}
