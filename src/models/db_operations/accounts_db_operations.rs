use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError};

use super::DbError;
use crate::models::{Account, Role};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn role_from_column(idx: usize, raw: &str) -> rusqlite::Result<Role> {
    Role::parse(raw).ok_or_else(|| {
        RusqliteError::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown role '{}'", raw).into(),
        )
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, name, email, role, membership_number, phone, active, joined_date, last_login_time";

fn account_from_row(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    let raw_role: String = row.get(3)?;
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: role_from_column(3, &raw_role)?,
        membership_number: row.get(4)?,
        phone: row.get(5)?,
        active: row.get(6)?,
        joined_date: row.get(7)?,
        last_login_time: row.get(8)?,
    })
}

/// Inserts a new account, hashing the password. Emails are unique
/// case-insensitively (COLLATE NOCASE on the column); a collision maps
/// to `DbError::Duplicate`.
pub fn create_account(
    conn: &Connection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    membership_number: Option<&str>,
    phone: Option<&str>,
) -> Result<i64, DbError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    let joined_date = Utc::now().to_rfc3339();
    let result = conn.execute(
        "INSERT INTO accounts (name, email, password_hash, role, membership_number, phone, active, joined_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
        params![
            name,
            email,
            hashed_password,
            role.as_str(),
            membership_number,
            phone,
            joined_date
        ],
    );
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(RusqliteError::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DbError::Duplicate(
                "An account with this email already exists.".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn read_all_accounts(conn: &Connection) -> Result<Vec<Account>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts ORDER BY id",
        ACCOUNT_COLUMNS
    ))?;
    let account_iter = stmt.query_map([], account_from_row)?;
    Ok(account_iter.filter_map(|a| a.ok()).collect())
}

pub fn read_account_by_id(conn: &Connection, id: i64) -> Option<Account> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
        [id],
        account_from_row,
    )
    .ok()
}

pub fn read_account_by_email(conn: &Connection, email: &str) -> Option<Account> {
    conn.query_row(
        &format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLUMNS),
        [email],
        account_from_row,
    )
    .ok()
}

/// Checks credentials against the stored hash. Inactive accounts are
/// rejected regardless of credential validity.
pub fn verify_credentials(conn: &Connection, email: &str, password: &str) -> Option<Account> {
    let hash_and_active: rusqlite::Result<(String, bool)> = conn.query_row(
        "SELECT password_hash, active FROM accounts WHERE email = ?1",
        [email],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    if let Ok((stored_hash, active)) = hash_and_active {
        if active && verify(password, &stored_hash).unwrap_or(false) {
            return read_account_by_email(conn, email);
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, id: i64) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE accounts SET last_login_time = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    Ok(())
}

/// Admin mutation of role, active flag and (optionally) the password.
/// Returns the number of updated rows so a missing account surfaces as 0.
pub fn update_account(
    conn: &Connection,
    id: i64,
    role: Role,
    active: bool,
    new_password: Option<&str>,
) -> Result<usize, DbError> {
    if let Some(password) = new_password {
        if !password.is_empty() {
            let hashed_password =
                hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
            let updated = conn.execute(
                "UPDATE accounts SET role = ?1, active = ?2, password_hash = ?3 WHERE id = ?4",
                params![role.as_str(), active, hashed_password, id],
            )?;
            return Ok(updated);
        }
    }

    let updated = conn.execute(
        "UPDATE accounts SET role = ?1, active = ?2 WHERE id = ?3",
        params![role.as_str(), active, id],
    )?;
    Ok(updated)
}

pub fn count_active_accounts(conn: &Connection) -> Result<u32, DbError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE active = 1",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().expect("in-memory sqlite");
        db_setup::setup_accounts_db(&mut conn).expect("schema");
        conn
    }

    #[test]
    fn create_and_verify_credentials() {
        let conn = test_conn();
        let id = create_account(
            &conn,
            "Amaya Perera",
            "amaya@example.org",
            "hunter2hunter2",
            Role::Member,
            Some("MBR-2026-0001"),
            None,
        )
        .unwrap();

        let account = verify_credentials(&conn, "amaya@example.org", "hunter2hunter2")
            .expect("valid credentials");
        assert_eq!(account.id, id);
        assert_eq!(account.role, Role::Member);
        assert!(verify_credentials(&conn, "amaya@example.org", "wrong").is_none());
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let conn = test_conn();
        create_account(
            &conn,
            "Amaya Perera",
            "Amaya@Example.org",
            "hunter2hunter2",
            Role::Member,
            None,
            None,
        )
        .unwrap();
        assert!(read_account_by_email(&conn, "amaya@example.org").is_some());
        assert!(verify_credentials(&conn, "AMAYA@EXAMPLE.ORG", "hunter2hunter2").is_some());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let conn = test_conn();
        create_account(
            &conn,
            "Amaya Perera",
            "amaya@example.org",
            "hunter2hunter2",
            Role::Member,
            None,
            None,
        )
        .unwrap();
        let err = create_account(
            &conn,
            "Another Person",
            "AMAYA@example.org",
            "password123",
            Role::Member,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[test]
    fn inactive_accounts_cannot_authenticate() {
        let conn = test_conn();
        let id = create_account(
            &conn,
            "Amaya Perera",
            "amaya@example.org",
            "hunter2hunter2",
            Role::Member,
            None,
            None,
        )
        .unwrap();
        update_account(&conn, id, Role::Member, false, None).unwrap();
        assert!(verify_credentials(&conn, "amaya@example.org", "hunter2hunter2").is_none());
    }

    #[test]
    fn update_account_changes_role_and_reports_missing_rows() {
        let conn = test_conn();
        let id = create_account(
            &conn,
            "Amaya Perera",
            "amaya@example.org",
            "hunter2hunter2",
            Role::Member,
            None,
            None,
        )
        .unwrap();
        assert_eq!(update_account(&conn, id, Role::Officer, true, None).unwrap(), 1);
        assert_eq!(
            read_account_by_id(&conn, id).unwrap().role,
            Role::Officer
        );
        assert_eq!(update_account(&conn, 9999, Role::Member, true, None).unwrap(), 0);
    }
}
