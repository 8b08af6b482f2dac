//! Error types for docflow-storage

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docflow_common::broker::BrokerReply;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob key absent from the store
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Blob store error: {0}")]
    BlobStore(#[from] std::io::Error),

    /// Row that cannot be mapped back to a DTO
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Token service error: {0}")]
    TokenService(String),

    #[error(transparent)]
    Common(#[from] docflow_common::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn corrupt(id: impl ToString, reason: impl ToString) -> Self {
        StorageError::CorruptRecord {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            StorageError::InvalidInput(_)
            | StorageError::Common(docflow_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            StorageError::BlobNotFound(_)
            | StorageError::Common(docflow_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::TokenService(err.to_string())
    }
}

/// Handler errors crossing the in-process broker keep their kind
impl From<StorageError> for docflow_common::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Common(inner) => inner,
            StorageError::Database(e) => docflow_common::Error::Database(e),
            StorageError::BlobStore(e) => docflow_common::Error::Io(e),
            StorageError::InvalidInput(msg) => docflow_common::Error::InvalidInput(msg),
            StorageError::BlobNotFound(key) => docflow_common::Error::NotFound(key),
            other => docflow_common::Error::Internal(other.to_string()),
        }
    }
}

/// Rendered as a broker reply carrying `err`
impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        (self.status(), Json(BrokerReply::error(self.to_string()))).into_response()
    }
}
