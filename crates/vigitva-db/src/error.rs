//! Store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collection {key} is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl From<vigitva_common::VigitvaError> for StoreError {
    fn from(err: vigitva_common::VigitvaError) -> Self {
        match err {
            vigitva_common::VigitvaError::Validation(msg) => StoreError::Validation(msg),
            vigitva_common::VigitvaError::EntityNotFound(msg) => StoreError::NotFound(msg),
            other => StoreError::Validation(other.to_string()),
        }
    }
}
