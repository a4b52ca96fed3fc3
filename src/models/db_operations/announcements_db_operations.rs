use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::Announcement;

pub const ANNOUNCEMENTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("announcements");

fn key_for(id: &str) -> Result<[u8; 16], DbError> {
    Ok(Uuid::parse_str(id)?.into_bytes())
}

pub fn create_announcement(db: &Database, announcement: &Announcement) -> Result<(), DbError> {
    let key = key_for(&announcement.id)?;
    let json = serde_json::to_string(announcement)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(ANNOUNCEMENTS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_announcement(db: &Database, id: &str) -> Result<Option<Announcement>, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(None),
    };

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(ANNOUNCEMENTS)?;
    let result = match table.get(&key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

/// Full-document replace. Fails with NotFound when the id was never
/// created, so updates cannot resurrect deleted announcements.
pub fn update_announcement(db: &Database, announcement: &Announcement) -> Result<(), DbError> {
    let key = key_for(&announcement.id)?;
    let json = serde_json::to_string(announcement)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(ANNOUNCEMENTS)?;
        if table.get(&key)?.is_none() {
            return Err(DbError::NotFound("Announcement not found.".to_string()));
        }
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn delete_announcement(db: &Database, id: &str) -> Result<bool, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(false),
    };

    let removed;
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(ANNOUNCEMENTS)?;
        removed = table.remove(&key)?.is_some();
    }
    write_txn.commit()?;
    Ok(removed)
}

/// Every announcement, pinned items first, then newest first. Audience
/// and expiry filtering is row-level policy and happens in the helper
/// layer.
pub fn read_all_announcements(db: &Database) -> Result<Vec<Announcement>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(ANNOUNCEMENTS)?;

    let mut announcements: Vec<Announcement> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str(json.value()).ok())
        .collect();

    announcements.sort_by(|a: &Announcement, b: &Announcement| {
        b.pinned
            .cmp(&a.pinned)
            .then(b.created_at.cmp(&a.created_at))
    });
    Ok(announcements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Audience, Priority};
    use chrono::{Duration, Utc};
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb")
    }

    fn sample(title: &str, pinned: bool, age_hours: i64) -> Announcement {
        let created_at = Utc::now() - Duration::hours(age_hours);
        Announcement {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: "content".to_string(),
            priority: Priority::Medium,
            target_audience: Audience::All,
            pinned,
            expiry_date: None,
            created_by: 1,
            created_by_name: "Admin".to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn ordering_is_pinned_first_then_newest() {
        let db = test_db();
        let old_pinned = sample("old pinned", true, 48);
        let newer = sample("newer", false, 1);
        let older = sample("older", false, 24);
        for a in [&newer, &old_pinned, &older] {
            create_announcement(&db, a).unwrap();
        }

        let all = read_all_announcements(&db).unwrap();
        let titles: Vec<&str> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["old pinned", "newer", "older"]);
    }

    #[test]
    fn update_requires_existing_document() {
        let db = test_db();
        let a = sample("ghost", false, 0);
        assert!(matches!(
            update_announcement(&db, &a),
            Err(DbError::NotFound(_))
        ));
        create_announcement(&db, &a).unwrap();
        assert!(update_announcement(&db, &a).is_ok());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let db = test_db();
        let a = sample("to delete", false, 0);
        create_announcement(&db, &a).unwrap();
        assert!(delete_announcement(&db, &a.id).unwrap());
        assert!(!delete_announcement(&db, &a.id).unwrap());
        assert!(read_announcement(&db, &a.id).unwrap().is_none());
    }
}
