use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{
    date_column, date_to_sql, optional_enum_column, optional_uuid_column, timestamp_column,
    timestamp_to_sql, uuid_column,
};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, account_id, first_name, last_name, date_of_birth, gender,
     blood_group, contact_number, email, address, registered_at";

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: uuid_column(row, 0)?,
        account_id: optional_uuid_column(row, 1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        date_of_birth: date_column(row, 4)?,
        gender: optional_enum_column(row, 5)?,
        blood_group: optional_enum_column(row, 6)?,
        contact_number: row.get(7)?,
        email: row.get(8)?,
        address: row.get(9)?,
        registered_at: timestamp_column(row, 10)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &PatientProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, account_id, first_name, last_name, date_of_birth, gender,
                               blood_group, contact_number, email, address, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.id.to_string(),
            patient.account_id.map(|id| id.to_string()),
            patient.first_name,
            patient.last_name,
            date_to_sql(&patient.date_of_birth),
            patient.gender.map(|g| g.as_str()),
            patient.blood_group.map(|b| b.as_str()),
            patient.contact_number,
            patient.email,
            patient.address,
            timestamp_to_sql(&patient.registered_at),
        ],
    )?;
    Ok(())
}

/// Overwrites the editable columns; `registered_at` never changes.
pub fn update_patient(conn: &Connection, patient: &PatientProfile) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET account_id = ?2, first_name = ?3, last_name = ?4,
                date_of_birth = ?5, gender = ?6, blood_group = ?7, contact_number = ?8,
                email = ?9, address = ?10
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.account_id.map(|id| id.to_string()),
            patient.first_name,
            patient.last_name,
            date_to_sql(&patient.date_of_birth),
            patient.gender.map(|g| g.as_str()),
            patient.blood_group.map(|b| b.as_str()),
            patient.contact_number,
            patient.email,
            patient.address,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", patient.id));
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<PatientProfile>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id.to_string()],
        patient_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_patient_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<PatientProfile>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE account_id = ?1"),
        params![account_id.to_string()],
        patient_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_patients(conn: &Connection) -> Result<Vec<PatientProfile>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY last_name ASC, first_name ASC"
    ))?;
    let rows = stmt.query_map([], patient_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Patient", id));
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}
