use redb::{CommitError, StorageError, TableError, TransactionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
}

pub mod accounts_db_operations;
pub mod announcements_db_operations;
pub mod applications_db_operations;
pub mod blog_db_operations;
pub mod events_db_operations;
pub mod intake_db_operations;
pub mod service_hours_db_operations;
pub mod suggestions_db_operations;
