use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{optional_uuid_column, uuid_column};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "id, account_id, first_name, last_name, specialization, contact_number, email, is_available";

fn doctor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DoctorProfile> {
    Ok(DoctorProfile {
        id: uuid_column(row, 0)?,
        account_id: optional_uuid_column(row, 1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        specialization: row.get(4)?,
        contact_number: row.get(5)?,
        email: row.get(6)?,
        is_available: row.get(7)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, account_id, first_name, last_name, specialization,
                              contact_number, email, is_available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doctor.id.to_string(),
            doctor.account_id.map(|id| id.to_string()),
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.contact_number,
            doctor.email,
            doctor.is_available,
        ],
    )?;
    Ok(())
}

/// Overwrites every editable column in one statement.
pub fn update_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET account_id = ?2, first_name = ?3, last_name = ?4,
                specialization = ?5, contact_number = ?6, email = ?7, is_available = ?8
         WHERE id = ?1",
        params![
            doctor.id.to_string(),
            doctor.account_id.map(|id| id.to_string()),
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.contact_number,
            doctor.email,
            doctor.is_available,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Doctor", doctor.id));
    }
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<DoctorProfile>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
        params![id.to_string()],
        doctor_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_doctor_by_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<DoctorProfile>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE account_id = ?1"),
        params![account_id.to_string()],
        doctor_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn list_doctors(
    conn: &Connection,
    filter: &DoctorFilter,
) -> Result<Vec<DoctorProfile>, DatabaseError> {
    let mut sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if filter.available_only {
        sql.push_str(" AND is_available = 1");
    }
    if let Some(ref specialization) = filter.specialization {
        values.push(specialization.clone());
        sql.push_str(&format!(" AND specialization = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY last_name ASC, first_name ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id.to_string()])?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Doctor", id));
    }
    Ok(())
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn doctor(last_name: &str, specialization: &str, available: bool) -> DoctorProfile {
        DoctorProfile {
            id: Uuid::new_v4(),
            account_id: None,
            first_name: "Sam".into(),
            last_name: last_name.into(),
            specialization: specialization.into(),
            contact_number: Some("555-0100".into()),
            email: None,
            is_available: available,
        }
    }

    #[test]
    fn filters_combine() {
        let conn = open_memory_database().unwrap();
        let a = doctor("Adams", "Cardiology", true);
        let b = doctor("Baker", "Cardiology", false);
        let c = doctor("Clark", "Neurology", true);
        for d in [&c, &b, &a] {
            insert_doctor(&conn, d).unwrap();
        }

        let all = list_doctors(&conn, &DoctorFilter::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|d| d.last_name.as_str()).collect();
        assert_eq!(names, vec!["Adams", "Baker", "Clark"]);

        let cardiology = DoctorFilter {
            available_only: true,
            specialization: Some("Cardiology".into()),
        };
        let found = list_doctors(&conn, &cardiology).unwrap();
        assert_eq!(found, vec![a]);
        assert_eq!(count_doctors(&conn).unwrap(), 3);
    }

    #[test]
    fn lookup_by_account() {
        let conn = open_memory_database().unwrap();
        let account_id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO accounts (id, username, email, credential, is_admin, created_at)
             VALUES (?1, 'drsam', 'sam@example.com', 'x', 0, '2026-03-01 09:00:00')",
            params![account_id.to_string()],
        )
        .unwrap();
        let mut linked = doctor("Adams", "Cardiology", true);
        linked.account_id = Some(account_id);
        insert_doctor(&conn, &linked).unwrap();

        assert_eq!(get_doctor_by_account(&conn, &account_id).unwrap(), Some(linked));
        assert_eq!(get_doctor_by_account(&conn, &Uuid::new_v4()).unwrap(), None);
    }

    #[test]
    fn update_missing_is_not_found() {
        let conn = open_memory_database().unwrap();
        let ghost = doctor("Ghost", "None", true);
        assert!(matches!(
            update_doctor(&conn, &ghost),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
