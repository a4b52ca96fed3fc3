use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::MembershipApplication;

pub const APPLICATIONS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("applications");

pub fn create_application(db: &Database, application: &MembershipApplication) -> Result<(), DbError> {
    let key = Uuid::parse_str(&application.id)?.into_bytes();
    let json = serde_json::to_string(application)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(APPLICATIONS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn list_applications(db: &Database) -> Result<Vec<MembershipApplication>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(APPLICATIONS)?;

    let mut applications: Vec<MembershipApplication> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str(json.value()).ok())
        .collect();

    applications.sort_by(|a: &MembershipApplication, b: &MembershipApplication| {
        b.created_at.cmp(&a.created_at)
    });
    Ok(applications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::APPLICATION_STATUS_PENDING;
    use chrono::{NaiveDate, Utc};
    use redb::backends::InMemoryBackend;

    #[test]
    fn applications_are_stored_pending_and_listed_newest_first() {
        let db = Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb");

        for name in ["First Applicant", "Second Applicant"] {
            let application = MembershipApplication {
                id: Uuid::new_v4().to_string(),
                full_name: name.to_string(),
                email: "applicant@example.org".to_string(),
                phone: "+941234567".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2004, 6, 1).unwrap(),
                address: "12 Temple Road, Galle".to_string(),
                school_or_university: None,
                grade_or_year: None,
                motivation: "I want to serve the community.".to_string(),
                experience: None,
                status: APPLICATION_STATUS_PENDING.to_string(),
                created_at: Utc::now(),
            };
            create_application(&db, &application).unwrap();
        }

        let listed = list_applications(&db).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|a| a.status == APPLICATION_STATUS_PENDING));
    }
}
