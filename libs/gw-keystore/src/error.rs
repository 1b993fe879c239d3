use gw_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("entry not found")]
    NotFound,
    #[error("wrong password")]
    AuthenticationFailed,
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed entry: {0}")]
    Malformed(String),
}

impl From<KeystoreError> for ErrorKind {
    fn from(err: KeystoreError) -> Self {
        match err {
            KeystoreError::NotFound => ErrorKind::NotFound,
            KeystoreError::AuthenticationFailed => ErrorKind::AuthInvalid,
            KeystoreError::Crypto(_) | KeystoreError::Malformed(_) | KeystoreError::Io(_) => {
                ErrorKind::EncodingError
            }
        }
    }
}
