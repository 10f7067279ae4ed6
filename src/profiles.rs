//! Profile store: doctor and patient records and their account links.
//!
//! An account links to at most one profile of either kind, and
//! administrator accounts link to none. Profiles with appointments on the
//! books cannot be deleted.

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::{ClinicError, ValidationError};
use crate::models::{DoctorDraft, DoctorFilter, DoctorProfile, PatientDraft, PatientProfile};
use crate::validation::{self, CONTACT_MAX, NAME_MAX, SPECIALIZATION_MAX};

/// Check that `account_id` may be linked to the profile `current`
/// (`None` for a profile not yet stored).
fn ensure_linkable(
    conn: &Connection,
    account_id: &Uuid,
    current: Option<&Uuid>,
) -> Result<(), ClinicError> {
    let account = repo::get_account(conn, account_id)?
        .ok_or_else(|| ClinicError::not_found("Account", account_id))?;
    if account.is_admin {
        return Err(ValidationError::AdministratorNotLinkable.into());
    }
    let (doctor, patient) = repo::get_account_links(conn, account_id)?;
    let linked_elsewhere = [doctor, patient]
        .into_iter()
        .flatten()
        .any(|profile_id| Some(&profile_id) != current);
    if linked_elsewhere {
        return Err(ValidationError::AccountAlreadyLinked(*account_id).into());
    }
    Ok(())
}

/// The account UNIQUE columns catch a link that raced past `ensure_linkable`.
fn link_conflict(account_id: Option<Uuid>) -> impl Fn(DatabaseError) -> ClinicError {
    move |err| match account_id {
        Some(id) if err.is_unique_violation() => ValidationError::AccountAlreadyLinked(id).into(),
        _ => err.into(),
    }
}

// ═══════════════════════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════════════════════

fn doctor_fields(id: Uuid, draft: &DoctorDraft) -> Result<DoctorProfile, ValidationError> {
    Ok(DoctorProfile {
        id,
        account_id: draft.account_id,
        first_name: validation::required_text("first_name", &draft.first_name, NAME_MAX)?,
        last_name: validation::required_text("last_name", &draft.last_name, NAME_MAX)?,
        specialization: validation::required_text(
            "specialization",
            &draft.specialization,
            SPECIALIZATION_MAX,
        )?,
        contact_number: Some(validation::required_text(
            "contact_number",
            &draft.contact_number,
            CONTACT_MAX,
        )?),
        email: Some(validation::email("email", &draft.email)?),
        is_available: draft.is_available,
    })
}

pub fn create_doctor(conn: &Connection, draft: &DoctorDraft) -> Result<DoctorProfile, ClinicError> {
    let doctor = doctor_fields(Uuid::new_v4(), draft)?;

    let tx = conn.unchecked_transaction()?;
    if let Some(account_id) = &doctor.account_id {
        ensure_linkable(&tx, account_id, None)?;
    }
    repo::insert_doctor(&tx, &doctor).map_err(link_conflict(doctor.account_id))?;
    tx.commit()?;

    tracing::info!(doctor_id = %doctor.id, linked = doctor.account_id.is_some(), "Doctor created");
    Ok(doctor)
}

pub fn update_doctor(
    conn: &Connection,
    id: &Uuid,
    draft: &DoctorDraft,
) -> Result<DoctorProfile, ClinicError> {
    let doctor = doctor_fields(*id, draft)?;

    let tx = conn.unchecked_transaction()?;
    if repo::get_doctor(&tx, id)?.is_none() {
        return Err(ClinicError::not_found("Doctor", id));
    }
    if let Some(account_id) = &doctor.account_id {
        ensure_linkable(&tx, account_id, Some(id))?;
    }
    repo::update_doctor(&tx, &doctor).map_err(link_conflict(doctor.account_id))?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, is_available = doctor.is_available, "Doctor updated");
    Ok(doctor)
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<DoctorProfile, ClinicError> {
    repo::get_doctor(conn, id)?.ok_or_else(|| ClinicError::not_found("Doctor", id))
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorProfile>, ClinicError> {
    Ok(repo::list_doctors(conn, &DoctorFilter::default())?)
}

/// Doctors currently accepting bookings.
pub fn list_available_doctors(conn: &Connection) -> Result<Vec<DoctorProfile>, ClinicError> {
    let filter = DoctorFilter {
        available_only: true,
        ..Default::default()
    };
    Ok(repo::list_doctors(conn, &filter)?)
}

pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), ClinicError> {
    let tx = conn.unchecked_transaction()?;
    let count = repo::count_appointments_for_doctor(&tx, id)?;
    if count > 0 {
        return Err(ValidationError::ProfileHasAppointments {
            entity_type: "Doctor",
            count,
        }
        .into());
    }
    repo::delete_doctor(&tx, id)?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, "Doctor deleted");
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Patients
// ═══════════════════════════════════════════════════════════

fn patient_fields(
    id: Uuid,
    account_id: Option<Uuid>,
    draft: &PatientDraft,
    registered_at: NaiveDateTime,
) -> Result<PatientProfile, ValidationError> {
    Ok(PatientProfile {
        id,
        account_id,
        first_name: validation::required_text("first_name", &draft.first_name, NAME_MAX)?,
        last_name: validation::required_text("last_name", &draft.last_name, NAME_MAX)?,
        date_of_birth: validation::date_of_birth(draft.date_of_birth, registered_at.date())?,
        gender: draft.gender,
        blood_group: draft.blood_group,
        contact_number: Some(validation::required_text(
            "contact_number",
            &draft.contact_number,
            CONTACT_MAX,
        )?),
        email: Some(validation::email("email", &draft.email)?),
        address: Some(validation::required_body("address", &draft.address)?),
        registered_at,
    })
}

/// The patient profile form: creates and links a profile the first time,
/// updates it afterwards.
pub fn upsert_own_patient_profile(
    conn: &Connection,
    account_id: &Uuid,
    draft: &PatientDraft,
    now: NaiveDateTime,
) -> Result<PatientProfile, ClinicError> {
    let now = now.trunc_subsecs(0);
    let tx = conn.unchecked_transaction()?;

    let patient = match repo::get_patient_by_account(&tx, account_id)? {
        Some(existing) => {
            let mut patient = patient_fields(existing.id, Some(*account_id), draft, now)?;
            patient.registered_at = existing.registered_at;
            repo::update_patient(&tx, &patient)?;
            tracing::info!(patient_id = %patient.id, "Patient profile updated");
            patient
        }
        None => {
            let patient = patient_fields(Uuid::new_v4(), Some(*account_id), draft, now)?;
            ensure_linkable(&tx, account_id, None)?;
            repo::insert_patient(&tx, &patient).map_err(link_conflict(Some(*account_id)))?;
            tracing::info!(patient_id = %patient.id, %account_id, "Patient profile created");
            patient
        }
    };
    tx.commit()?;
    Ok(patient)
}

/// Administrator adds a patient record, not linked to any account.
pub fn create_patient(
    conn: &Connection,
    draft: &PatientDraft,
    now: NaiveDateTime,
) -> Result<PatientProfile, ClinicError> {
    let patient = patient_fields(Uuid::new_v4(), None, draft, now.trunc_subsecs(0))?;
    repo::insert_patient(conn, &patient)?;
    tracing::info!(patient_id = %patient.id, "Patient created");
    Ok(patient)
}

/// Administrator edit. Keeps the account link and registration time.
pub fn update_patient(
    conn: &Connection,
    id: &Uuid,
    draft: &PatientDraft,
    now: NaiveDateTime,
) -> Result<PatientProfile, ClinicError> {
    let tx = conn.unchecked_transaction()?;
    let existing = get_patient(&tx, id)?;
    let mut patient = patient_fields(*id, existing.account_id, draft, now.trunc_subsecs(0))?;
    patient.registered_at = existing.registered_at;
    repo::update_patient(&tx, &patient)?;
    tx.commit()?;

    tracing::info!(patient_id = %id, "Patient updated");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<PatientProfile, ClinicError> {
    repo::get_patient(conn, id)?.ok_or_else(|| ClinicError::not_found("Patient", id))
}

pub fn patient_for_account(
    conn: &Connection,
    account_id: &Uuid,
) -> Result<Option<PatientProfile>, ClinicError> {
    Ok(repo::get_patient_by_account(conn, account_id)?)
}

pub fn list_patients(conn: &Connection) -> Result<Vec<PatientProfile>, ClinicError> {
    Ok(repo::list_patients(conn)?)
}

pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), ClinicError> {
    let tx = conn.unchecked_transaction()?;
    let count = repo::count_appointments_for_patient(&tx, id)?;
    if count > 0 {
        return Err(ValidationError::ProfileHasAppointments {
            entity_type: "Patient",
            count,
        }
        .into());
    }
    repo::delete_patient(&tx, id)?;
    tx.commit()?;

    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(())
}
