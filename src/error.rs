//! Tracker error types with HTTP status code mapping.
//!
//! [`TrackerError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "activity type 'rocket_launch' not found"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`TrackerError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                    |
/// |-----------|-----------------------|--------------------------------|
/// | 1000–1999 | Validation            | 400 Bad Request                |
/// | 2000–2999 | Not Found / Conflict  | 400 Bad Request / 404 Not Found |
/// | 3000–3999 | Server / Dependency   | 500 Internal Server Error      |
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Request shape or field validation failed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The activity identifier is not in the emission factor table.
    #[error("activity type '{0}' not found")]
    ActivityNotFound(String),

    /// No user is registered under the given email.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Subscribe was called for an email that is already subscribed.
    #[error("user is already subscribed: {0}")]
    AlreadySubscribed(String),

    /// A tip was requested for a user who has unsubscribed.
    #[error("user is not subscribed: {0}")]
    NotSubscribed(String),

    /// No route matched the request path.
    #[error("endpoint not found")]
    RouteNotFound,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Outbound notification delivery failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// Invalid or unusable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::RouteNotFound => 2000,
            Self::ActivityNotFound(_) => 2001,
            Self::UserNotFound(_) => 2002,
            Self::AlreadySubscribed(_) => 2003,
            Self::NotSubscribed(_) => 2004,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::Notification(_) => 3002,
            Self::Config(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::ActivityNotFound(_)
            | Self::AlreadySubscribed(_)
            | Self::NotSubscribed(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Notification(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message exposed to the client. Server-side failures are reported
    /// generically; their details only go to the log.
    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.public_message(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
