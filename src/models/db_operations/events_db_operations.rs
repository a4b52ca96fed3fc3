use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::{AttendanceRecord, Event, Rsvp};

pub const EVENTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("events");

pub fn create_event(db: &Database, event: &Event) -> Result<(), DbError> {
    let key = Uuid::parse_str(&event.id)?.into_bytes();
    let json = serde_json::to_string(event)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(EVENTS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn read_event(db: &Database, id: &str) -> Result<Option<Event>, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(None),
    };

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(EVENTS)?;
    let result = match table.get(&key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    };
    result
}

pub fn update_event(db: &Database, event: &Event) -> Result<(), DbError> {
    let key = Uuid::parse_str(&event.id)?.into_bytes();
    let json = serde_json::to_string(event)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(EVENTS)?;
        if table.get(&key)?.is_none() {
            return Err(DbError::NotFound("Event not found.".to_string()));
        }
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn delete_event(db: &Database, id: &str) -> Result<bool, DbError> {
    let key = match Uuid::parse_str(id) {
        Ok(uuid) => uuid.into_bytes(),
        Err(_) => return Ok(false),
    };

    let removed;
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(EVENTS)?;
        removed = table.remove(&key)?.is_some();
    }
    write_txn.commit()?;
    Ok(removed)
}

/// Every event, soonest first. Board-meeting visibility is row-level
/// policy applied by the helper layer.
pub fn list_events(db: &Database) -> Result<Vec<Event>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(EVENTS)?;

    let mut events: Vec<Event> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str(json.value()).ok())
        .collect();

    events.sort_by(|a: &Event, b: &Event| a.date.cmp(&b.date));
    Ok(events)
}

pub fn count_upcoming_events(db: &Database, now: DateTime<Utc>) -> Result<u32, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(EVENTS)?;

    let count = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<Event>(json.value()).ok())
        .filter(|event| event.date >= now)
        .count();
    Ok(count as u32)
}

/// Replaces the caller's RSVP inside a single write transaction: any
/// existing entry for the user is removed and the new one appended, so
/// the event never holds more than one RSVP per user even when requests
/// race.
pub fn upsert_rsvp(db: &Database, event_id: &str, rsvp: Rsvp) -> Result<Event, DbError> {
    let key = Uuid::parse_str(event_id)
        .map_err(|_| DbError::NotFound("Event not found.".to_string()))?
        .into_bytes();

    let write_txn = db.begin_write()?;
    let event = {
        let mut table = write_txn.open_table(EVENTS)?;

        let mut event: Event = match table.get(&key)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(DbError::NotFound("Event not found.".to_string())),
        };

        event.rsvps.retain(|r| r.user_id != rsvp.user_id);
        event.rsvps.push(rsvp);
        event.updated_at = Utc::now();

        let json = serde_json::to_string(&event)?;
        table.insert(&key, json.as_str())?;
        event
    };
    write_txn.commit()?;
    Ok(event)
}

/// Updates the caller's attendance record in place, or appends one, in a
/// single write transaction. One record per user is the steady state.
pub fn upsert_attendance(
    db: &Database,
    event_id: &str,
    record: AttendanceRecord,
) -> Result<Event, DbError> {
    let key = Uuid::parse_str(event_id)
        .map_err(|_| DbError::NotFound("Event not found.".to_string()))?
        .into_bytes();

    let write_txn = db.begin_write()?;
    let event = {
        let mut table = write_txn.open_table(EVENTS)?;

        let mut event: Event = match table.get(&key)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(DbError::NotFound("Event not found.".to_string())),
        };

        match event
            .attendance
            .iter_mut()
            .find(|a| a.user_id == record.user_id)
        {
            Some(existing) => *existing = record,
            None => event.attendance.push(record),
        }
        event.updated_at = Utc::now();

        let json = serde_json::to_string(&event)?;
        table.insert(&key, json.as_str())?;
        event
    };
    write_txn.commit()?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, MeetingType, RsvpStatus};
    use chrono::Duration;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb")
    }

    fn sample_event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4().to_string(),
            title: "Monthly General Meeting".to_string(),
            description: "Agenda to follow.".to_string(),
            date: now + Duration::days(7),
            end_date: None,
            location: "Community hall".to_string(),
            category: "meeting".to_string(),
            max_attendees: Some(10),
            registration_deadline: None,
            meeting_type: MeetingType::General,
            rsvps: vec![],
            attendance: vec![],
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn rsvp(user_id: i64, status: RsvpStatus) -> Rsvp {
        Rsvp {
            user_id,
            user_name: format!("Member {}", user_id),
            user_email: format!("member{}@example.org", user_id),
            status,
            responded_at: Utc::now(),
        }
    }

    #[test]
    fn rsvp_is_replace_on_write() {
        let db = test_db();
        let event = sample_event();
        create_event(&db, &event).unwrap();

        upsert_rsvp(&db, &event.id, rsvp(5, RsvpStatus::Going)).unwrap();
        let after = upsert_rsvp(&db, &event.id, rsvp(5, RsvpStatus::Maybe)).unwrap();

        assert_eq!(after.rsvps.len(), 1);
        assert_eq!(after.rsvps[0].status, RsvpStatus::Maybe);
    }

    #[test]
    fn repeating_the_same_rsvp_leaves_one_record() {
        let db = test_db();
        let event = sample_event();
        create_event(&db, &event).unwrap();

        upsert_rsvp(&db, &event.id, rsvp(5, RsvpStatus::Going)).unwrap();
        let after = upsert_rsvp(&db, &event.id, rsvp(5, RsvpStatus::Going)).unwrap();

        assert_eq!(after.rsvps.len(), 1);
        assert_eq!(after.going_count(), 1);
    }

    #[test]
    fn attendance_updates_in_place_or_appends() {
        let db = test_db();
        let event = sample_event();
        create_event(&db, &event).unwrap();

        let mark = |status| AttendanceRecord {
            user_id: 5,
            user_name: "Member 5".to_string(),
            user_email: "member5@example.org".to_string(),
            status,
            marked_at: Utc::now(),
        };

        let first = upsert_attendance(&db, &event.id, mark(AttendanceStatus::Late)).unwrap();
        assert_eq!(first.attendance.len(), 1);
        let second = upsert_attendance(&db, &event.id, mark(AttendanceStatus::Present)).unwrap();
        assert_eq!(second.attendance.len(), 1);
        assert_eq!(second.attendance[0].status, AttendanceStatus::Present);
    }

    #[test]
    fn rsvp_on_missing_event_is_not_found() {
        let db = test_db();
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            upsert_rsvp(&db, &missing, rsvp(1, RsvpStatus::Going)),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn upcoming_count_ignores_past_events() {
        let db = test_db();
        let now = Utc::now();

        let mut past = sample_event();
        past.date = now - Duration::days(3);
        create_event(&db, &past).unwrap();
        create_event(&db, &sample_event()).unwrap();

        assert_eq!(count_upcoming_events(&db, now).unwrap(), 1);
    }
}
