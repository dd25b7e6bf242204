pub mod connection;
pub mod document;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use document::{DocumentError, DocumentStore, InMemoryDocumentStore};
pub use fixtures::{DemoSeedDataset, RequestSeedInfo, SeedResult, VerificationResult};
pub use repositories::{DocumentRequestStore, RepositoryError, SqlStore};
