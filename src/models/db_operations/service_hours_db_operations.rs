use std::collections::BTreeMap;

use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::{LeaderboardEntry, ReviewStatus, ServiceHour};

pub const SERVICE_HOURS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("service_hours");

pub fn create_service_hour(db: &Database, entry: &ServiceHour) -> Result<(), DbError> {
    let key = Uuid::parse_str(&entry.id)?.into_bytes();
    let json = serde_json::to_string(entry)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SERVICE_HOURS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_service_hour(db: &Database, id: &str) -> Result<Option<ServiceHour>, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(None),
    };

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SERVICE_HOURS)?;
    let result = match table.get(&key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

/// Full-document replace after a review transition has been validated.
pub fn update_service_hour(db: &Database, entry: &ServiceHour) -> Result<(), DbError> {
    let key = Uuid::parse_str(&entry.id)?.into_bytes();
    let json = serde_json::to_string(entry)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(SERVICE_HOURS)?;
        if table.get(&key)?.is_none() {
            return Err(DbError::NotFound("Service hour entry not found.".to_string()));
        }
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Entries newest-first, optionally narrowed to one user and/or one
/// review status. Row scoping for member callers is decided by policy
/// before this is called.
pub fn list_service_hours(
    db: &Database,
    user_filter: Option<i64>,
    status_filter: Option<ReviewStatus>,
) -> Result<Vec<ServiceHour>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SERVICE_HOURS)?;

    let mut entries: Vec<ServiceHour> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<ServiceHour>(json.value()).ok())
        .filter(|entry| user_filter.map_or(true, |user_id| entry.user_id == user_id))
        .filter(|entry| status_filter.map_or(true, |status| entry.status == status))
        .collect();

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(entries)
}

/// Groups approved entries by user, sums hours, and ranks by total
/// descending. Ties keep the incidental scan order.
pub fn leaderboard(db: &Database, limit: usize) -> Result<Vec<LeaderboardEntry>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SERVICE_HOURS)?;

    let mut totals: BTreeMap<i64, LeaderboardEntry> = BTreeMap::new();
    for item in table.iter()? {
        let (_, json) = match item {
            Ok(pair) => pair,
            Err(_) => continue,
        };
        let entry: ServiceHour = match serde_json::from_str(json.value()) {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry.status != ReviewStatus::Approved {
            continue;
        }
        let row = totals.entry(entry.user_id).or_insert_with(|| LeaderboardEntry {
            user_id: entry.user_id,
            user_name: entry.user_name.clone(),
            total_hours: 0.0,
            entries: 0,
        });
        row.total_hours += entry.hours;
        row.entries += 1;
    }

    let mut ranking: Vec<LeaderboardEntry> = totals.into_values().collect();
    ranking.sort_by(|a, b| b.total_hours.total_cmp(&a.total_hours));
    ranking.truncate(limit);
    Ok(ranking)
}

/// Sum of every logged hour regardless of review status. The dashboard
/// reports this figure while the leaderboard counts approved hours only;
/// both behaviors are preserved as observed.
pub fn total_hours(db: &Database) -> Result<f64, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(SERVICE_HOURS)?;

    let sum = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<ServiceHour>(json.value()).ok())
        .map(|entry| entry.hours)
        .sum();
    Ok(sum)
}
