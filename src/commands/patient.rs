//! Patient self-service: profile form, dashboard, booking, cancellation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{appointment_target, RequestContext};
use crate::access::{Action, DenyReason, Target};
use crate::db::repository as repo;
use crate::error::{ClinicError, ValidationError};
use crate::ledger;
use crate::models::{
    Appointment, AppointmentDetail, AppointmentFilter, AppointmentSortKey, DoctorProfile,
    NewAppointment, PatientDraft, PatientProfile, SortOrder, TimeBound,
};
use crate::profiles;
use crate::scheduling;

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub patient: PatientProfile,
    pub upcoming: Vec<AppointmentDetail>,
    pub past: Vec<AppointmentDetail>,
}

/// Booking form contents.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub reason: String,
}

/// The caller's patient profile id, after the workspace check.
fn patient_scope(ctx: &RequestContext<'_>) -> Result<Uuid, ClinicError> {
    ctx.authorize(Action::Read, &Target::PatientWorkspace)?;
    ctx.role()
        .and_then(|role| role.patient_id())
        .ok_or(ClinicError::Authorization(DenyReason::InsufficientRole))
}

/// Current profile for the form, if one exists yet.
pub fn my_profile(ctx: &RequestContext<'_>) -> Result<Option<PatientProfile>, ClinicError> {
    ctx.authorize(Action::Read, &Target::OwnPatientProfile)?;
    profiles::patient_for_account(ctx.conn, &ctx.account_id()?)
}

/// Submit the profile form. Open to signed-in accounts without a profile.
pub fn save_profile(
    ctx: &RequestContext<'_>,
    draft: &PatientDraft,
) -> Result<PatientProfile, ClinicError> {
    let action = if ctx.role().and_then(|r| r.patient_id()).is_some() {
        Action::Update
    } else {
        Action::Create
    };
    ctx.authorize(action, &Target::OwnPatientProfile)?;
    profiles::upsert_own_patient_profile(ctx.conn, &ctx.account_id()?, draft, ctx.now)
}

pub fn dashboard(ctx: &RequestContext<'_>) -> Result<PatientDashboard, ClinicError> {
    let patient_id = patient_scope(ctx)?;
    let patient = profiles::get_patient(ctx.conn, &patient_id)?;

    let upcoming = repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_patient(patient_id)
            .bounded(TimeBound::After(ctx.now))
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Ascending),
    )?;
    let past = repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_patient(patient_id)
            .bounded(TimeBound::AtOrBefore(ctx.now))
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
    )?;

    tracing::debug!(%patient_id, upcoming = upcoming.len(), past = past.len(), "Patient dashboard");
    Ok(PatientDashboard {
        patient,
        upcoming,
        past,
    })
}

/// Every appointment of the caller, latest first.
pub fn my_appointments(ctx: &RequestContext<'_>) -> Result<Vec<AppointmentDetail>, ClinicError> {
    let patient_id = patient_scope(ctx)?;
    Ok(repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_patient(patient_id)
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
    )?)
}

/// Appointments that have already started, latest first.
pub fn medical_history(ctx: &RequestContext<'_>) -> Result<Vec<AppointmentDetail>, ClinicError> {
    let patient_id = patient_scope(ctx)?;
    Ok(repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_patient(patient_id)
            .bounded(TimeBound::Before(ctx.now))
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
    )?)
}

/// Doctors offered on the booking form.
pub fn bookable_doctors(ctx: &RequestContext<'_>) -> Result<Vec<DoctorProfile>, ClinicError> {
    ctx.authorize(Action::Read, &Target::Doctor)?;
    profiles::list_available_doctors(ctx.conn)
}

pub fn book_appointment(
    ctx: &RequestContext<'_>,
    request: &BookingRequest,
) -> Result<Appointment, ClinicError> {
    let patient_id = patient_scope(ctx)?;
    ctx.authorize(Action::Create, &Target::NewAppointment { patient_id })?;

    let doctor = profiles::get_doctor(ctx.conn, &request.doctor_id)?;
    if !doctor.is_available {
        return Err(ValidationError::DoctorUnavailable(doctor.id).into());
    }

    if let Err(rejection) =
        scheduling::validate(request.scheduled_at, ctx.now, &ctx.config.scheduling)
    {
        tracing::warn!(%patient_id, reason = rejection.code(), "Booking rejected");
        return Err(ValidationError::Scheduling(rejection).into());
    }

    ledger::open(
        ctx.conn,
        &NewAppointment {
            doctor_id: doctor.id,
            patient_id,
            scheduled_at: request.scheduled_at,
            reason: request.reason.clone(),
        },
        ctx.now,
    )
}

pub fn view_appointment(
    ctx: &RequestContext<'_>,
    id: &Uuid,
) -> Result<AppointmentDetail, ClinicError> {
    patient_scope(ctx)?;
    let detail = repo::get_appointment_detail(ctx.conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment", id))?;
    ctx.authorize(Action::Read, &appointment_target(&detail.appointment))?;
    Ok(detail)
}

pub fn cancel_appointment(
    ctx: &RequestContext<'_>,
    id: &Uuid,
) -> Result<Appointment, ClinicError> {
    patient_scope(ctx)?;
    let appointment = ledger::get(ctx.conn, id)?;
    ctx.authorize(Action::Cancel, &appointment_target(&appointment))?;
    ledger::cancel(ctx.conn, id, ctx.actor()?, ctx.now, &ctx.config.ledger)
}
