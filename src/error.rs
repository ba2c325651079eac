use reqwest::StatusCode;
use validator::ValidationErrors;

use crate::storage::StorageError;

#[derive(thiserror::Error)]
pub enum Error {
    #[error("Transport error")]
    Transport(#[from] reqwest::Error),

    #[error("Api error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Unexpected response body")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Unauthenticated")]
    Unauthenticated,
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
