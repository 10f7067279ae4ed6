use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{timestamp_column, timestamp_to_sql, uuid_column};
use crate::db::DatabaseError;
use crate::models::*;

const ACCOUNT_COLUMNS: &str = "id, username, email, credential, is_admin, created_at";

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: uuid_column(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        credential: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

pub fn insert_account(conn: &Connection, account: &Account) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO accounts (id, username, email, credential, is_admin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id.to_string(),
            account.username,
            account.email,
            account.credential,
            account.is_admin,
            timestamp_to_sql(&account.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, id: &Uuid) -> Result<Option<Account>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![id.to_string()],
        account_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Exact, case-sensitive username lookup.
pub fn get_account_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<Account>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
        params![username],
        account_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Exact, case-sensitive email lookup.
pub fn get_account_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<Account>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
        params![email],
        account_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY username ASC"
    ))?;
    let rows = stmt.query_map([], account_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Non-admin accounts with no doctor and no patient profile attached.
pub fn list_unlinked_accounts(conn: &Connection) -> Result<Vec<Account>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.username, a.email, a.credential, a.is_admin, a.created_at
         FROM accounts a
         WHERE a.is_admin = 0
           AND NOT EXISTS (SELECT 1 FROM doctors d WHERE d.account_id = a.id)
           AND NOT EXISTS (SELECT 1 FROM patients p WHERE p.account_id = a.id)
         ORDER BY a.username ASC",
    )?;
    let rows = stmt.query_map([], account_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Removes the account. Linked profiles fall back to unlinked (ON DELETE SET NULL).
pub fn delete_account(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM accounts WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }
    Ok(())
}

/// Profile links for an account: (doctor profile id, patient profile id).
pub fn get_account_links(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<(Option<Uuid>, Option<Uuid>), DatabaseError> {
    let key = account_id.to_string();
    let doctor: Option<String> = conn
        .query_row(
            "SELECT id FROM doctors WHERE account_id = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    let patient: Option<String> = conn
        .query_row(
            "SELECT id FROM patients WHERE account_id = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    let parse = |raw: Option<String>| -> Result<Option<Uuid>, DatabaseError> {
        raw.map(|s| {
            Uuid::parse_str(&s)
                .map_err(|e| DatabaseError::ConstraintViolation(format!("Corrupt profile id {s}: {e}")))
        })
        .transpose()
    };
    Ok((parse(doctor)?, parse(patient)?))
}
