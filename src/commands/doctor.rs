//! Doctor workspace: own schedule, appointment review, visit notes.

use serde::Serialize;
use uuid::Uuid;

use super::{appointment_target, RequestContext};
use crate::access::{Action, DenyReason, Target};
use crate::db::repository as repo;
use crate::error::ClinicError;
use crate::ledger::{self, VisitRecord};
use crate::models::{
    Appointment, AppointmentDetail, AppointmentFilter, AppointmentSortKey, DoctorProfile,
    SortOrder, TimeBound,
};
use crate::profiles;

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub doctor: DoctorProfile,
    pub upcoming: Vec<AppointmentDetail>,
    pub past: Vec<AppointmentDetail>,
}

fn doctor_scope(ctx: &RequestContext<'_>) -> Result<Uuid, ClinicError> {
    ctx.authorize(Action::Read, &Target::DoctorWorkspace)?;
    ctx.role()
        .and_then(|role| role.doctor_id())
        .ok_or(ClinicError::Authorization(DenyReason::InsufficientRole))
}

pub fn dashboard(ctx: &RequestContext<'_>) -> Result<DoctorDashboard, ClinicError> {
    let doctor_id = doctor_scope(ctx)?;
    let doctor = profiles::get_doctor(ctx.conn, &doctor_id)?;

    let upcoming = repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_doctor(doctor_id)
            .bounded(TimeBound::AtOrAfter(ctx.now))
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Ascending),
    )?;
    let past = repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::for_doctor(doctor_id)
            .bounded(TimeBound::Before(ctx.now))
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
    )?;

    tracing::debug!(%doctor_id, upcoming = upcoming.len(), past = past.len(), "Doctor dashboard");
    Ok(DoctorDashboard {
        doctor,
        upcoming,
        past,
    })
}

pub fn view_appointment(
    ctx: &RequestContext<'_>,
    id: &Uuid,
) -> Result<AppointmentDetail, ClinicError> {
    doctor_scope(ctx)?;
    let detail = repo::get_appointment_detail(ctx.conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment", id))?;
    ctx.authorize(Action::Read, &appointment_target(&detail.appointment))?;
    Ok(detail)
}

/// Save visit notes and the resulting status in one commit.
pub fn record_visit(
    ctx: &RequestContext<'_>,
    id: &Uuid,
    record: &VisitRecord,
) -> Result<Appointment, ClinicError> {
    doctor_scope(ctx)?;
    let appointment = ledger::get(ctx.conn, id)?;
    ctx.authorize(Action::Update, &appointment_target(&appointment))?;
    ledger::record_visit(ctx.conn, id, record, ctx.now, &ctx.config.ledger)
}
