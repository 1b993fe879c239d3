//! Error kinds shared across the gateway's crates (§7 ERROR HANDLING DESIGN).
//!
//! These are the vocabulary every crate's own `thiserror` type maps into at
//! its boundary, so the HTTP layer has one place to decide status codes
//! instead of re-deriving them per component.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum ErrorKind {
    #[error("missing API key")]
    AuthMissing,
    #[error("invalid or expired API key")]
    AuthInvalid,
    #[error("rate or quota exceeded")]
    QuotaExceeded,
    #[error("backend unavailable")]
    BackendUnavailable,
    #[error("circuit open")]
    CircuitOpen,
    #[error("upstream timeout")]
    UpstreamTimeout,
    #[error("encoding error")]
    EncodingError,
    #[error("admin key required")]
    AdminRequired,
    #[error("bad request")]
    BadRequest,
    #[error("not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ErrorKind {
    /// HTTP status code for non-universal endpoints (§7, §6.3).
    /// `CircuitOpen` and `UpstreamTimeout` fold into `BackendUnavailable`.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::AuthMissing | ErrorKind::AuthInvalid | ErrorKind::AdminRequired => 401,
            ErrorKind::QuotaExceeded => 429,
            ErrorKind::BackendUnavailable
            | ErrorKind::CircuitOpen
            | ErrorKind::UpstreamTimeout => 503,
            ErrorKind::EncodingError => 500,
            ErrorKind::BadRequest => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::MethodNotAllowed => 405,
        }
    }

    /// Message surfaced in universal-endpoint envelopes, which never use a
    /// non-200 status for backend-side failures (§4.8, §7).
    pub fn envelope_message(&self) -> &'static str {
        match self {
            ErrorKind::AuthMissing => "missing API key",
            ErrorKind::AuthInvalid => "invalid or expired API key",
            ErrorKind::QuotaExceeded => "rate limit exceeded",
            ErrorKind::BackendUnavailable | ErrorKind::CircuitOpen | ErrorKind::UpstreamTimeout => {
                "backend unavailable"
            }
            ErrorKind::EncodingError => "internal encoding error",
            ErrorKind::AdminRequired => "admin key required",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::NotFound => "not found",
            ErrorKind::MethodNotAllowed => "method not allowed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_and_timeout_fold_into_backend_unavailable() {
        assert_eq!(ErrorKind::CircuitOpen.status_code(), 503);
        assert_eq!(ErrorKind::UpstreamTimeout.status_code(), 503);
        assert_eq!(ErrorKind::BackendUnavailable.status_code(), 503);
    }
}
