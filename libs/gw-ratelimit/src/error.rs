use gw_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("request quota exceeded")]
    QuotaExceeded,
    #[error("websocket connection quota exceeded")]
    WsQuotaExceeded,
    #[error("api key missing")]
    KeyMissing,
    #[error("api key invalid or expired")]
    KeyInvalid,
}

impl From<RateLimitError> for ErrorKind {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::QuotaExceeded | RateLimitError::WsQuotaExceeded => {
                ErrorKind::QuotaExceeded
            }
            RateLimitError::KeyMissing => ErrorKind::AuthMissing,
            RateLimitError::KeyInvalid => ErrorKind::AuthInvalid,
        }
    }
}
