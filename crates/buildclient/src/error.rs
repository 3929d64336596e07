use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("build request rejected: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("build not found: {0}")]
    NotFound(String),

    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    /// Worth retrying on the next poll tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Validation(_) | ClientError::NotFound(_) => false,
        }
    }
}
