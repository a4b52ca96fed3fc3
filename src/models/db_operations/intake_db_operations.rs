use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use super::DbError;
use crate::models::{ContactMessage, ContactStatus, Payment};

pub const CONTACT_MESSAGES: TableDefinition<&[u8; 16], &str> =
    TableDefinition::new("contact_messages");
pub const PAYMENTS: TableDefinition<&[u8; 16], &str> = TableDefinition::new("payments");

// Contact messages and payments are plain intake queues: records are
// written once and read by moderators. Their status fields are never
// advanced by any operation in this codebase.

pub fn create_contact_message(db: &Database, message: &ContactMessage) -> Result<(), DbError> {
    let key = Uuid::parse_str(&message.id)?.into_bytes();
    let json = serde_json::to_string(message)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(CONTACT_MESSAGES)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn list_contact_messages(
    db: &Database,
    status_filter: Option<ContactStatus>,
) -> Result<Vec<ContactMessage>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(CONTACT_MESSAGES)?;

    let mut messages: Vec<ContactMessage> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str::<ContactMessage>(json.value()).ok())
        .filter(|m| status_filter.map_or(true, |status| m.status == status))
        .collect();

    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(messages)
}

pub fn create_payment(db: &Database, payment: &Payment) -> Result<(), DbError> {
    let key = Uuid::parse_str(&payment.id)?.into_bytes();
    let json = serde_json::to_string(payment)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(PAYMENTS)?;
        table.insert(&key, json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn list_payments(db: &Database) -> Result<Vec<Payment>, DbError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(PAYMENTS)?;

    let mut payments: Vec<Payment> = table
        .iter()?
        .filter_map(|res| res.ok())
        .filter_map(|(_, json)| serde_json::from_str(json.value()).ok())
        .collect();

    payments.sort_by(|a: &Payment, b: &Payment| b.created_at.cmp(&a.created_at));
    Ok(payments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::Utc;
    use redb::backends::InMemoryBackend;

    fn test_db() -> Database {
        Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .expect("in-memory redb")
    }

    #[test]
    fn contact_listing_filters_by_status() {
        let db = test_db();
        for status in [ContactStatus::New, ContactStatus::New, ContactStatus::Read] {
            let message = ContactMessage {
                id: Uuid::new_v4().to_string(),
                name: "Visitor".to_string(),
                email: "visitor@example.org".to_string(),
                subject: "Joining".to_string(),
                message: "How do I join?".to_string(),
                status,
                created_at: Utc::now(),
            };
            create_contact_message(&db, &message).unwrap();
        }

        assert_eq!(list_contact_messages(&db, None).unwrap().len(), 3);
        assert_eq!(
            list_contact_messages(&db, Some(ContactStatus::New))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            list_contact_messages(&db, Some(ContactStatus::Replied))
                .unwrap()
                .len(),
            0
        );
    }

    #[test]
    fn payments_are_stored_and_listed() {
        let db = test_db();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            payer_name: "Donor".to_string(),
            payer_email: "donor@example.org".to_string(),
            amount_cents: 500000,
            currency: "LKR".to_string(),
            purpose: "annual-dues".to_string(),
            reference: None,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        create_payment(&db, &payment).unwrap();

        let listed = list_payments(&db).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, PaymentStatus::Pending);
    }
}
