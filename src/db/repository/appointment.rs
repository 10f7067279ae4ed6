use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{enum_column, timestamp_column, timestamp_to_sql, uuid_column};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str =
    "a.id, a.doctor_id, a.patient_id, a.scheduled_at, a.reason, a.notes, a.status, a.created_at";

const DETAIL_JOIN: &str = "FROM appointments a
     JOIN doctors d ON a.doctor_id = d.id
     JOIN patients p ON a.patient_id = p.id";

fn appointment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_column(row, 0)?,
        doctor_id: uuid_column(row, 1)?,
        patient_id: uuid_column(row, 2)?,
        scheduled_at: timestamp_column(row, 3)?,
        reason: row.get(4)?,
        notes: row.get(5)?,
        status: enum_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
    })
}

fn detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentDetail> {
    Ok(AppointmentDetail {
        appointment: appointment_from_row(row)?,
        doctor_name: row.get(8)?,
        doctor_specialization: row.get(9)?,
        patient_name: row.get(10)?,
    })
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, doctor_id, patient_id, scheduled_at, reason, notes,
                                   status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.doctor_id.to_string(),
            appt.patient_id.to_string(),
            timestamp_to_sql(&appt.scheduled_at),
            appt.reason,
            appt.notes,
            appt.status.as_str(),
            timestamp_to_sql(&appt.created_at),
        ],
    )?;
    Ok(())
}

/// Writes the mutable fields of an appointment in a single statement.
/// Parties and `created_at` are immutable and never touched.
pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET scheduled_at = ?2, reason = ?3, notes = ?4, status = ?5
         WHERE id = ?1",
        params![
            appt.id.to_string(),
            timestamp_to_sql(&appt.scheduled_at),
            appt.reason,
            appt.notes,
            appt.status.as_str(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", appt.id));
    }
    Ok(())
}

pub fn get_appointment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Appointment>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"),
        params![id.to_string()],
        appointment_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_appointment_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AppointmentDetail>, DatabaseError> {
    conn.query_row(
        &format!(
            "SELECT {APPOINTMENT_COLUMNS},
                    d.first_name || ' ' || d.last_name, d.specialization,
                    p.first_name || ' ' || p.last_name
             {DETAIL_JOIN}
             WHERE a.id = ?1"
        ),
        params![id.to_string()],
        detail_from_row,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// WHERE/ORDER/LIMIT tail for an appointment filter, plus its bound values.
fn filter_clause(filter: &AppointmentFilter) -> (String, Vec<String>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut values: Vec<String> = Vec::new();

    if let Some(doctor_id) = filter.doctor_id {
        values.push(doctor_id.to_string());
        sql.push_str(&format!(" AND a.doctor_id = ?{}", values.len()));
    }
    if let Some(patient_id) = filter.patient_id {
        values.push(patient_id.to_string());
        sql.push_str(&format!(" AND a.patient_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        sql.push_str(&format!(" AND a.status = ?{}", values.len()));
    }
    if let Some(bound) = filter.bound {
        let (op, ts) = match bound {
            TimeBound::After(ts) => (">", ts),
            TimeBound::AtOrAfter(ts) => (">=", ts),
            TimeBound::Before(ts) => ("<", ts),
            TimeBound::AtOrBefore(ts) => ("<=", ts),
        };
        values.push(timestamp_to_sql(&ts));
        sql.push_str(&format!(" AND a.scheduled_at {op} ?{}", values.len()));
    }

    sql.push_str(&format!(
        " ORDER BY a.{} {}, a.id ASC",
        filter.sort_by.column(),
        filter.order.as_sql()
    ));
    if let Some(limit) = filter.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    (sql, values)
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let (tail, values) = filter_clause(filter);
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a{tail}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), appointment_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Same as [`list_appointments`] but joined with both parties' names.
pub fn list_appointment_details(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentDetail>, DatabaseError> {
    let (tail, values) = filter_clause(filter);
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS},
                d.first_name || ' ' || d.last_name, d.specialization,
                p.first_name || ' ' || p.last_name
         {DETAIL_JOIN}{tail}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), detail_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Whether the doctor already holds a live (Scheduled) booking at this start time.
pub fn slot_taken(
    conn: &Connection,
    doctor_id: &Uuid,
    scheduled_at: &NaiveDateTime,
    excluding: Option<&Uuid>,
) -> Result<bool, DatabaseError> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM appointments
             WHERE doctor_id = ?1 AND scheduled_at = ?2 AND status = 'scheduled'
               AND (?3 IS NULL OR id != ?3))",
        params![
            doctor_id.to_string(),
            timestamp_to_sql(scheduled_at),
            excluding.map(|id| id.to_string()),
        ],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("Appointment", id));
    }
    Ok(())
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_appointments_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1",
        params![doctor_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn count_appointments_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_doctor, insert_patient};
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn seed(conn: &Connection) -> (Uuid, Uuid) {
        let doctor = DoctorProfile {
            id: Uuid::new_v4(),
            account_id: None,
            first_name: "John".into(),
            last_name: "Smith".into(),
            specialization: "Cardiology".into(),
            contact_number: Some("555-1234".into()),
            email: Some("john.smith@hospital.com".into()),
            is_available: true,
        };
        insert_doctor(conn, &doctor).unwrap();
        let patient = PatientProfile {
            id: Uuid::new_v4(),
            account_id: None,
            first_name: "Maria".into(),
            last_name: "Lopez".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1985, 2, 14).unwrap(),
            gender: Some(Gender::Female),
            blood_group: Some(BloodGroup::OPositive),
            contact_number: None,
            email: None,
            address: Some("12 Elm St".into()),
            registered_at: ts(1, 9),
        };
        insert_patient(conn, &patient).unwrap();
        (doctor.id, patient.id)
    }

    fn book(conn: &Connection, doctor_id: Uuid, patient_id: Uuid, at: NaiveDateTime) -> Appointment {
        let appt = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            scheduled_at: at,
            reason: "checkup".into(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            created_at: ts(1, 8),
        };
        insert_appointment(conn, &appt).unwrap();
        appt
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let appt = book(&conn, doctor_id, patient_id, ts(10, 10));

        let loaded = get_appointment(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(loaded, appt);
    }

    #[test]
    fn detail_carries_party_names() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let appt = book(&conn, doctor_id, patient_id, ts(10, 10));

        let detail = get_appointment_detail(&conn, &appt.id).unwrap().unwrap();
        assert_eq!(detail.doctor_name, "John Smith");
        assert_eq!(detail.doctor_specialization, "Cardiology");
        assert_eq!(detail.patient_name, "Maria Lopez");
    }

    #[test]
    fn filter_by_bound_and_order() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        book(&conn, doctor_id, patient_id, ts(9, 10));
        book(&conn, doctor_id, patient_id, ts(11, 10));
        book(&conn, doctor_id, patient_id, ts(12, 10));

        let upcoming = list_appointments(
            &conn,
            &AppointmentFilter::for_patient(patient_id)
                .bounded(TimeBound::After(ts(10, 0)))
                .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
        )
        .unwrap();
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].scheduled_at, ts(12, 10));

        let boundary = list_appointments(
            &conn,
            &AppointmentFilter::for_doctor(doctor_id).bounded(TimeBound::AtOrBefore(ts(9, 10))),
        )
        .unwrap();
        assert_eq!(boundary.len(), 1);
    }

    #[test]
    fn limit_caps_results() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        for day in 9..14 {
            book(&conn, doctor_id, patient_id, ts(day, 10));
        }
        let firsts = list_appointments(&conn, &AppointmentFilter::default().limited(2)).unwrap();
        assert_eq!(firsts.len(), 2);
        assert_eq!(firsts[0].scheduled_at, ts(9, 10));
    }

    #[test]
    fn filter_by_status() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let mut done = book(&conn, doctor_id, patient_id, ts(9, 10));
        done.status = AppointmentStatus::Completed;
        update_appointment(&conn, &done).unwrap();
        let live = book(&conn, doctor_id, patient_id, ts(11, 10));

        let scheduled = list_appointments(
            &conn,
            &AppointmentFilter::for_doctor(doctor_id).with_status(AppointmentStatus::Scheduled),
        )
        .unwrap();
        assert_eq!(scheduled, vec![live]);

        let completed = list_appointments(
            &conn,
            &AppointmentFilter::default().with_status(AppointmentStatus::Completed),
        )
        .unwrap();
        assert_eq!(completed, vec![done]);

        let cancelled = list_appointments(
            &conn,
            &AppointmentFilter::default().with_status(AppointmentStatus::Cancelled),
        )
        .unwrap();
        assert!(cancelled.is_empty());
    }

    #[test]
    fn live_slot_is_unique_per_doctor() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let first = book(&conn, doctor_id, patient_id, ts(10, 10));
        assert!(slot_taken(&conn, &doctor_id, &ts(10, 10), None).unwrap());
        assert!(!slot_taken(&conn, &doctor_id, &ts(10, 10), Some(&first.id)).unwrap());

        let clash = Appointment {
            id: Uuid::new_v4(),
            ..first.clone()
        };
        let err = insert_appointment(&conn, &clash).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn cancelled_slot_is_free_again() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let mut first = book(&conn, doctor_id, patient_id, ts(10, 10));
        first.status = AppointmentStatus::Cancelled;
        update_appointment(&conn, &first).unwrap();

        assert!(!slot_taken(&conn, &doctor_id, &ts(10, 10), None).unwrap());
        book(&conn, doctor_id, patient_id, ts(10, 10));
    }

    #[test]
    fn update_missing_is_not_found() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        let ghost = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            scheduled_at: ts(10, 10),
            reason: "x".into(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            created_at: ts(1, 8),
        };
        assert!(matches!(
            update_appointment(&conn, &ghost),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            delete_appointment(&conn, &ghost.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn profile_delete_restricted_while_booked() {
        let conn = open_memory_database().unwrap();
        let (doctor_id, patient_id) = seed(&conn);
        book(&conn, doctor_id, patient_id, ts(10, 10));

        let err = crate::db::repository::delete_doctor(&conn, &doctor_id).unwrap_err();
        assert!(err.is_foreign_key_violation());
        assert_eq!(count_appointments_for_doctor(&conn, &doctor_id).unwrap(), 1);
        assert_eq!(count_appointments_for_patient(&conn, &patient_id).unwrap(), 1);
    }
}
