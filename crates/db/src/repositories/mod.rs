use thiserror::Error;

use campusdesk_core::store::StoreError;

use crate::document::DocumentError;

pub mod document;
pub mod sql;

pub use document::DocumentRequestStore;
pub use sql::SqlStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document store error: {0}")]
    Document(#[from] DocumentError),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Decode(message) => StoreError::Decode(message),
            RepositoryError::Database(sqlx::Error::ColumnDecode { index, source }) => {
                StoreError::Decode(format!("column {index}: {source}"))
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
