use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

use crate::models::db_operations::{
    announcements_db_operations::ANNOUNCEMENTS,
    applications_db_operations::APPLICATIONS,
    blog_db_operations::{BLOG_POSTS, BLOG_SLUG_INDEX},
    events_db_operations::EVENTS,
    intake_db_operations::{CONTACT_MESSAGES, PAYMENTS},
    service_hours_db_operations::SERVICE_HOURS,
    suggestions_db_operations::SUGGESTIONS,
};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_accounts_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    tx.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('member', 'officer', 'admin')),
            membership_number TEXT,
            phone TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            joined_date TEXT NOT NULL,
            last_login_time TEXT
        )",
        [],
    )?;
    tx.commit()?;
    Ok(())
}

/// Opens every document collection once so the first request never races
/// table creation.
pub fn setup_documents_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(ANNOUNCEMENTS)?;
        write_txn.open_table(BLOG_POSTS)?;
        write_txn.open_table(BLOG_SLUG_INDEX)?;
        write_txn.open_table(SERVICE_HOURS)?;
        write_txn.open_table(SUGGESTIONS)?;
        write_txn.open_table(APPLICATIONS)?;
        write_txn.open_table(EVENTS)?;
        write_txn.open_table(CONTACT_MESSAGES)?;
        write_txn.open_table(PAYMENTS)?;
    }
    write_txn.commit()?;
    Ok(())
}
