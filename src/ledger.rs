//! Appointment ledger: lifecycle state machine and atomic mutations.
//!
//! States: `Scheduled` (initial), `Completed` and `Cancelled` (terminal).
//! Every creation enters `Scheduled`. Transitions by actor:
//! - Doctor: `Scheduled -> Completed`
//! - Patient: `Scheduled -> Cancelled` while `now < scheduled_at`
//! - Administrator: any move out of `Scheduled`; out of a terminal state
//!   only with `LedgerConfig::admin_status_override`
//!
//! Callers authorize first; this module trusts the actor it is given.
//! Each mutation reads, checks and writes inside one transaction.

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::{ClinicError, ValidationError};
use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Administrator,
    Doctor,
    Patient,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionError {
    #[error("Appointment is already {from} and can no longer change")]
    Terminal { from: AppointmentStatus },

    #[error("Appointments can only be cancelled before they start")]
    CancellationWindowClosed,

    #[error("Cannot move appointment from {from} to {to}")]
    NotPermitted {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

impl TransitionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Terminal { .. } => "TERMINAL_STATE",
            Self::CancellationWindowClosed => "CANCELLATION_WINDOW_CLOSED",
            Self::NotPermitted { .. } => "TRANSITION_NOT_PERMITTED",
        }
    }
}

/// Decide whether `actor` may move an appointment from `from` to `to`.
/// Pure, like the scheduling policy: `now` is injected.
pub fn check_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
    actor: Actor,
    scheduled_at: NaiveDateTime,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> Result<(), TransitionError> {
    if from.is_terminal() {
        if actor == Actor::Administrator && config.admin_status_override {
            return Ok(());
        }
        return Err(TransitionError::Terminal { from });
    }

    match (actor, to) {
        (_, AppointmentStatus::Scheduled) => Ok(()),
        (Actor::Administrator, _) => Ok(()),
        (Actor::Doctor, AppointmentStatus::Completed) => Ok(()),
        (Actor::Patient, AppointmentStatus::Cancelled) => {
            if now < scheduled_at {
                Ok(())
            } else {
                Err(TransitionError::CancellationWindowClosed)
            }
        }
        _ => Err(TransitionError::NotPermitted { from, to }),
    }
}

/// Doctor's post-visit form: notes plus the resulting status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

/// Administrator's edit form. Party references never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRevision {
    pub scheduled_at: NaiveDateTime,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn slot_conflict(err: DatabaseError) -> ClinicError {
    if err.is_unique_violation() {
        ValidationError::SlotTaken.into()
    } else {
        err.into()
    }
}

pub fn get(conn: &Connection, id: &Uuid) -> Result<Appointment, ClinicError> {
    repo::get_appointment(conn, id)?.ok_or_else(|| ClinicError::not_found("Appointment", id))
}

/// Put a new appointment on the books in `Scheduled`.
///
/// Both parties must exist and the doctor must not already hold a live
/// booking at the same start time.
pub fn open(
    conn: &Connection,
    request: &NewAppointment,
    now: NaiveDateTime,
) -> Result<Appointment, ClinicError> {
    let reason = validation::required_body("reason", &request.reason)?;
    let scheduled_at = request.scheduled_at.trunc_subsecs(0);

    let tx = conn.unchecked_transaction()?;

    if repo::get_doctor(&tx, &request.doctor_id)?.is_none() {
        return Err(ClinicError::not_found("Doctor", request.doctor_id));
    }
    if repo::get_patient(&tx, &request.patient_id)?.is_none() {
        return Err(ClinicError::not_found("Patient", request.patient_id));
    }
    if repo::slot_taken(&tx, &request.doctor_id, &scheduled_at, None)? {
        return Err(ValidationError::SlotTaken.into());
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        doctor_id: request.doctor_id,
        patient_id: request.patient_id,
        scheduled_at,
        reason,
        notes: None,
        status: AppointmentStatus::Scheduled,
        created_at: now.trunc_subsecs(0),
    };
    repo::insert_appointment(&tx, &appointment).map_err(slot_conflict)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        patient_id = %appointment.patient_id,
        "Appointment scheduled"
    );
    Ok(appointment)
}

/// Doctor annotates a visit and optionally marks it completed.
pub fn record_visit(
    conn: &Connection,
    id: &Uuid,
    record: &VisitRecord,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> Result<Appointment, ClinicError> {
    let tx = conn.unchecked_transaction()?;
    let mut appointment = get(&tx, id)?;

    if record.status != appointment.status {
        check_transition(
            appointment.status,
            record.status,
            Actor::Doctor,
            appointment.scheduled_at,
            now,
            config,
        )?;
    }

    appointment.notes = normalize_notes(record.notes.as_deref());
    appointment.status = record.status;
    repo::update_appointment(&tx, &appointment)?;
    tx.commit()?;

    tracing::info!(appointment_id = %id, status = %appointment.status, "Visit recorded");
    Ok(appointment)
}

/// Move an appointment to `Cancelled` on behalf of `actor`.
pub fn cancel(
    conn: &Connection,
    id: &Uuid,
    actor: Actor,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> Result<Appointment, ClinicError> {
    let tx = conn.unchecked_transaction()?;
    let mut appointment = get(&tx, id)?;

    if let Err(err) = check_transition(
        appointment.status,
        AppointmentStatus::Cancelled,
        actor,
        appointment.scheduled_at,
        now,
        config,
    ) {
        tracing::warn!(appointment_id = %id, ?actor, reason = err.code(), "Cancellation refused");
        return Err(err.into());
    }

    appointment.status = AppointmentStatus::Cancelled;
    repo::update_appointment(&tx, &appointment)?;
    tx.commit()?;

    tracing::info!(appointment_id = %id, ?actor, "Appointment cancelled");
    Ok(appointment)
}

/// Administrator edit of time, reason, notes and status.
///
/// A status change goes through the state machine; editing the other
/// fields of a terminal appointment is allowed. An appointment that ends up
/// `Scheduled` must not collide with another live booking.
pub fn revise(
    conn: &Connection,
    id: &Uuid,
    revision: &AppointmentRevision,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> Result<Appointment, ClinicError> {
    let reason = validation::required_body("reason", &revision.reason)?;
    let scheduled_at = revision.scheduled_at.trunc_subsecs(0);

    let tx = conn.unchecked_transaction()?;
    let mut appointment = get(&tx, id)?;

    if revision.status != appointment.status {
        check_transition(
            appointment.status,
            revision.status,
            Actor::Administrator,
            appointment.scheduled_at,
            now,
            config,
        )?;
    }

    let rebooks = revision.status == AppointmentStatus::Scheduled
        && (appointment.status != AppointmentStatus::Scheduled
            || appointment.scheduled_at != scheduled_at);
    if rebooks && repo::slot_taken(&tx, &appointment.doctor_id, &scheduled_at, Some(id))? {
        return Err(ValidationError::SlotTaken.into());
    }

    appointment.scheduled_at = scheduled_at;
    appointment.reason = reason;
    appointment.notes = normalize_notes(revision.notes.as_deref());
    appointment.status = revision.status;
    repo::update_appointment(&tx, &appointment).map_err(slot_conflict)?;
    tx.commit()?;

    tracing::info!(appointment_id = %id, status = %appointment.status, "Appointment revised");
    Ok(appointment)
}

/// Physically remove an appointment.
pub fn remove(conn: &Connection, id: &Uuid) -> Result<(), ClinicError> {
    repo::delete_appointment(conn, id)?;
    tracing::info!(appointment_id = %id, "Appointment deleted");
    Ok(())
}
