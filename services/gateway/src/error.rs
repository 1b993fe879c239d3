//! Gateway-wide error type and its mapping onto HTTP responses (§7).

use gw_types::ErrorKind;
use hyper::{Body, Response, StatusCode};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_missing() -> Self {
        Self::new(ErrorKind::AuthMissing, "missing API key")
    }

    pub fn auth_invalid() -> Self {
        Self::new(ErrorKind::AuthInvalid, "invalid or expired API key")
    }

    pub fn admin_required() -> Self {
        Self::new(ErrorKind::AdminRequired, "admin key required")
    }

    pub fn quota_exceeded() -> Self {
        Self::new(ErrorKind::QuotaExceeded, "rate limit exceeded")
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, "method not allowed")
    }

    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EncodingError, message)
    }

    /// Render as a standalone HTTP error response (non-universal endpoints).
    pub fn into_response(self) -> Response<Body> {
        let status = StatusCode::from_u16(self.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = json!({ "error": self.kind.envelope_message(), "message": self.message });
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| Response::new(Body::from("internal error")))
    }
}
