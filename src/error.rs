//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! [`TransportError`] covers failures of the outbound send primitive; the
//! notification sink swallows those after logging, so they never surface
//! to clients or into registry state.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ConnectionId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "unknown resource: Bogus",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No resource with the given name exists in the catalog.
    ///
    /// A subscribe request naming an unknown resource produces no new
    /// subscription and leaves existing subscriptions untouched.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The supplied filter expression was rejected by the resource's
    /// filter compiler. The request is dropped without mutating any
    /// subscription.
    #[error("filter rejected for resource {resource}: {reason}")]
    FilterRejected {
        /// Resource the filter was aimed at.
        resource: String,
        /// Compiler-provided rejection reason.
        reason: String,
    },

    /// A resource was registered under a name containing a reserved
    /// character sequence.
    #[error("invalid resource name: {0}")]
    InvalidResourceName(String),

    /// A resource with the same name is already registered.
    #[error("resource already registered: {0}")]
    DuplicateResource(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidResourceName(_) => 1001,
            Self::FilterRejected { .. } => 1002,
            Self::UnknownResource(_) => 2001,
            Self::DuplicateResource(_) => 2002,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidResourceName(_) | Self::FilterRejected { .. } => StatusCode::BAD_REQUEST,
            Self::UnknownResource(_) => StatusCode::NOT_FOUND,
            Self::DuplicateResource(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure of the transport's send primitive.
///
/// Raised by [`crate::service::EnvelopeTransport::send`]; the
/// notification sink logs and swallows every variant.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection has no registered outbound channel (already gone).
    #[error("connection {0} is not registered")]
    ConnectionGone(ConnectionId),

    /// The connection's outbound queue is full; the notification is
    /// dropped (delivery is best-effort).
    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),

    /// The envelope could not be serialized.
    #[error("envelope serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
