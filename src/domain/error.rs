use thiserror::Error;

use super::model::AuthMethod;
use crate::api::ApiError;

#[derive(Debug, Clone, Error)]
pub enum ImportError {
    #[error("{0}")]
    Transport(String),

    #[error("server returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("{host} requires {method} authentication")]
    AuthenticationRequired { host: String, method: AuthMethod },

    #[error("transfer ended after {received} of {expected} bytes")]
    Incomplete { received: u64, expected: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("A download is already in progress")]
    DownloadInProgress,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl ImportError {
    /// HTTP status attached to the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ImportError::HttpStatus { status } => Some(*status),
            ImportError::AuthenticationRequired { .. } => Some(401),
            _ => None,
        }
    }
}

impl From<ApiError> for ImportError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status { status, .. } => ImportError::HttpStatus { status },
            ApiError::Unauthorized { host, method } => {
                ImportError::AuthenticationRequired { host, method }
            }
            other => ImportError::Transport(other.to_string()),
        }
    }
}
