use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::{ProjectSuggestion, SuggestionStatus};

pub const SUGGESTIONS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("suggestions");

pub fn create_suggestion(db: &Database, suggestion: &ProjectSuggestion) -> Result<(), DbError> {
    let key = Uuid::parse_str(&suggestion.id)?.into_bytes();
    let json = serde_json::to_string(suggestion)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SUGGESTIONS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_suggestion(db: &Database, id: &str) -> Result<Option<ProjectSuggestion>, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(None),
    };

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SUGGESTIONS)?;
    let result = match table.get(&key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

/// Full-document replace after the review transition was validated.
pub fn update_suggestion(db: &Database, suggestion: &ProjectSuggestion) -> Result<(), DbError> {
    let key = Uuid::parse_str(&suggestion.id)?.into_bytes();
    let json = serde_json::to_string(suggestion)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SUGGESTIONS)?;
        if table.get(&key)?.is_none() {
            return Err(DbError::NotFound("Suggestion not found.".to_string()));
        }
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn delete_suggestion(db: &Database, id: &str) -> Result<bool, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(false),
    };

    let removed;
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SUGGESTIONS)?;
        removed = table.remove(&key)?.is_some();
    }
    write_txn.commit()?;
    Ok(removed)
}

/// Suggestions newest-first, optionally narrowed to one status.
pub fn list_suggestions(
    db: &Database,
    status_filter: Option<SuggestionStatus>,
) -> Result<Vec<ProjectSuggestion>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SUGGESTIONS)?;

    let mut suggestions: Vec<ProjectSuggestion> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<ProjectSuggestion>(json.value()).ok())
        .filter(|s| status_filter.map_or(true, |status| s.status == status))
        .collect();

    suggestions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    Ok(suggestions)
}

pub fn count_suggestions(db: &Database) -> Result<u32, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SUGGESTIONS)?;
    Ok(table.len()? as u32)
}
