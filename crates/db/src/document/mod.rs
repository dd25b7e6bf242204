//! Path-addressed JSON document storage.
//!
//! Paths are `/`-separated keys into a single JSON tree. `update` applies a
//! set of relative paths in one step, so a caller can touch several
//! collections at once and observe either all of the writes or none.

pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::InMemoryDocumentStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("invalid document path `{0}`")]
    InvalidPath(String),
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, DocumentError>;

    /// Replaces the value at `path`. Writing `null` removes it.
    async fn write(&self, path: &str, value: Value) -> Result<(), DocumentError>;

    /// Reserves a new child key under `path`. Keys sort in creation order.
    async fn append(&self, path: &str) -> Result<String, DocumentError>;

    /// Merge-writes every `relative path -> value` pair below `path` at once.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), DocumentError>;
}

pub(crate) fn segments(path: &str) -> Result<Vec<&str>, DocumentError> {
    let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    if parts.iter().any(|part| part.trim().is_empty() || *part == "." || *part == "..") {
        return Err(DocumentError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

pub(crate) fn join(base: &str, child: &str) -> String {
    match (base.trim_matches('/'), child.trim_matches('/')) {
        ("", child) => child.to_string(),
        (base, "") => base.to_string(),
        (base, child) => format!("{base}/{child}"),
    }
}
