use gw_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum BreakerError {
    #[error("circuit breaker open for chain")]
    Open,
}

impl From<BreakerError> for ErrorKind {
    fn from(err: BreakerError) -> Self {
        match err {
            BreakerError::Open => ErrorKind::CircuitOpen,
        }
    }
}
