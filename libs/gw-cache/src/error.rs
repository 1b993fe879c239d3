use gw_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("upstream call failed: {0}")]
    UpstreamFailed(String),
}

impl From<CacheError> for ErrorKind {
    fn from(_: CacheError) -> Self {
        ErrorKind::BackendUnavailable
    }
}
