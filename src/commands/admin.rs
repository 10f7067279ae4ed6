//! Administrator console: records management and appointment oversight.
//!
//! Every command is gated on the caller being an administrator; bookings
//! made here skip the self-service scheduling rules and the availability
//! flag, but still respect the per-doctor slot.

use serde::Serialize;
use uuid::Uuid;

use super::RequestContext;
use crate::access::{Action, Target};
use crate::db::repository as repo;
use crate::error::ClinicError;
use crate::identity;
use crate::ledger::{self, AppointmentRevision};
use crate::models::{
    Account, Appointment, AppointmentDetail, AppointmentFilter, AppointmentSortKey, DoctorDraft,
    DoctorProfile, NewAppointment, PatientDraft, PatientProfile, SortOrder,
};
use crate::profiles;

const RECENT_APPOINTMENTS: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub doctor_count: i64,
    pub patient_count: i64,
    pub appointment_count: i64,
    /// Most recently created first.
    pub recent: Vec<AppointmentDetail>,
}

pub fn dashboard(ctx: &RequestContext<'_>) -> Result<AdminDashboard, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    Ok(AdminDashboard {
        doctor_count: repo::count_doctors(ctx.conn)?,
        patient_count: repo::count_patients(ctx.conn)?,
        appointment_count: repo::count_appointments(ctx.conn)?,
        recent: repo::list_appointment_details(
            ctx.conn,
            &AppointmentFilter::default()
                .ordered(AppointmentSortKey::CreatedAt, SortOrder::Descending)
                .limited(RECENT_APPOINTMENTS),
        )?,
    })
}

// ── Accounts ────────────────────────────────────────────

pub fn list_accounts(ctx: &RequestContext<'_>) -> Result<Vec<Account>, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    Ok(repo::list_accounts(ctx.conn)?)
}

/// Accounts offered in the doctor form's link selector.
pub fn linkable_accounts(ctx: &RequestContext<'_>) -> Result<Vec<Account>, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    Ok(repo::list_unlinked_accounts(ctx.conn)?)
}

pub fn delete_account(ctx: &RequestContext<'_>, account_id: &Uuid) -> Result<(), ClinicError> {
    ctx.authorize(Action::Delete, &Target::AdminConsole)?;
    identity::delete_account(ctx.conn, account_id)
}

// ── Doctors ─────────────────────────────────────────────

pub fn list_doctors(ctx: &RequestContext<'_>) -> Result<Vec<DoctorProfile>, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    profiles::list_doctors(ctx.conn)
}

pub fn get_doctor(ctx: &RequestContext<'_>, id: &Uuid) -> Result<DoctorProfile, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    profiles::get_doctor(ctx.conn, id)
}

pub fn create_doctor(
    ctx: &RequestContext<'_>,
    draft: &DoctorDraft,
) -> Result<DoctorProfile, ClinicError> {
    ctx.authorize(Action::Create, &Target::AdminConsole)?;
    profiles::create_doctor(ctx.conn, draft)
}

pub fn update_doctor(
    ctx: &RequestContext<'_>,
    id: &Uuid,
    draft: &DoctorDraft,
) -> Result<DoctorProfile, ClinicError> {
    ctx.authorize(Action::Update, &Target::AdminConsole)?;
    profiles::update_doctor(ctx.conn, id, draft)
}

pub fn delete_doctor(ctx: &RequestContext<'_>, id: &Uuid) -> Result<(), ClinicError> {
    ctx.authorize(Action::Delete, &Target::AdminConsole)?;
    profiles::delete_doctor(ctx.conn, id)
}

// ── Patients ────────────────────────────────────────────

pub fn list_patients(ctx: &RequestContext<'_>) -> Result<Vec<PatientProfile>, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    profiles::list_patients(ctx.conn)
}

pub fn get_patient(ctx: &RequestContext<'_>, id: &Uuid) -> Result<PatientProfile, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    profiles::get_patient(ctx.conn, id)
}

pub fn create_patient(
    ctx: &RequestContext<'_>,
    draft: &PatientDraft,
) -> Result<PatientProfile, ClinicError> {
    ctx.authorize(Action::Create, &Target::AdminConsole)?;
    profiles::create_patient(ctx.conn, draft, ctx.now)
}

pub fn update_patient(
    ctx: &RequestContext<'_>,
    id: &Uuid,
    draft: &PatientDraft,
) -> Result<PatientProfile, ClinicError> {
    ctx.authorize(Action::Update, &Target::AdminConsole)?;
    profiles::update_patient(ctx.conn, id, draft, ctx.now)
}

pub fn delete_patient(ctx: &RequestContext<'_>, id: &Uuid) -> Result<(), ClinicError> {
    ctx.authorize(Action::Delete, &Target::AdminConsole)?;
    profiles::delete_patient(ctx.conn, id)
}

// ── Appointments ────────────────────────────────────────

/// All appointments, latest start first.
pub fn list_appointments(ctx: &RequestContext<'_>) -> Result<Vec<AppointmentDetail>, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    Ok(repo::list_appointment_details(
        ctx.conn,
        &AppointmentFilter::default()
            .ordered(AppointmentSortKey::ScheduledAt, SortOrder::Descending),
    )?)
}

pub fn view_appointment(
    ctx: &RequestContext<'_>,
    id: &Uuid,
) -> Result<AppointmentDetail, ClinicError> {
    ctx.authorize(Action::Read, &Target::AdminConsole)?;
    repo::get_appointment_detail(ctx.conn, id)?
        .ok_or_else(|| ClinicError::not_found("Appointment", id))
}

pub fn book_appointment(
    ctx: &RequestContext<'_>,
    request: &NewAppointment,
) -> Result<Appointment, ClinicError> {
    ctx.authorize(Action::Create, &Target::AdminConsole)?;
    ledger::open(ctx.conn, request, ctx.now)
}

pub fn revise_appointment(
    ctx: &RequestContext<'_>,
    id: &Uuid,
    revision: &AppointmentRevision,
) -> Result<Appointment, ClinicError> {
    ctx.authorize(Action::Update, &Target::AdminConsole)?;
    ledger::revise(ctx.conn, id, revision, ctx.now, &ctx.config.ledger)
}

pub fn cancel_appointment(ctx: &RequestContext<'_>, id: &Uuid) -> Result<Appointment, ClinicError> {
    ctx.authorize(Action::Cancel, &Target::AdminConsole)?;
    ledger::cancel(ctx.conn, id, ctx.actor()?, ctx.now, &ctx.config.ledger)
}

pub fn delete_appointment(ctx: &RequestContext<'_>, id: &Uuid) -> Result<(), ClinicError> {
    ctx.authorize(Action::Delete, &Target::AdminConsole)?;
    ledger::remove(ctx.conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DenyReason;
    use crate::commands::tests::fast_config;
    use crate::config::ClinicConfig;
    use crate::db::sqlite::open_memory_database;
    use crate::error::ValidationError;
    use crate::identity::tests::{registration, FAST};
    use crate::models::AppointmentStatus;
    use crate::profiles::tests::{doctor_draft, patient_draft};
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use rusqlite::Connection;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn setup() -> (Connection, ClinicConfig, Uuid) {
        let conn = open_memory_database().unwrap();
        let admin = identity::bootstrap_administrator(
            &conn,
            "admin",
            "admin@example.com",
            "admin123",
            FAST,
            at(1, 8),
        )
        .unwrap()
        .unwrap();
        (conn, fast_config(), admin.id)
    }

    #[test]
    fn admin_books_outside_patient_rules() {
        let (conn, config, admin_id) = setup();
        let ctx = RequestContext::open(&conn, &config, Some(admin_id), at(2, 9)).unwrap();
        let mut draft = doctor_draft();
        draft.is_available = false;
        let doctor = create_doctor(&ctx, &draft).unwrap();
        let patient = create_patient(&ctx, &patient_draft()).unwrap();

        // Saturday evening, unavailable doctor, within the lead time window
        // would all stop a patient.
        let appt = book_appointment(
            &ctx,
            &NewAppointment {
                doctor_id: doctor.id,
                patient_id: patient.id,
                scheduled_at: at(7, 20),
                reason: "urgent review".into(),
            },
        )
        .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);

        let clash = book_appointment(
            &ctx,
            &NewAppointment {
                doctor_id: doctor.id,
                patient_id: patient.id,
                scheduled_at: at(7, 20),
                reason: "duplicate".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(clash, ClinicError::Validation(ValidationError::SlotTaken)));
    }

    #[test]
    fn dashboard_counts_and_recent_five() {
        let (conn, config, admin_id) = setup();
        let doctor = profiles::create_doctor(&conn, &doctor_draft()).unwrap();
        let patient = profiles::create_patient(&conn, &patient_draft(), at(1, 9)).unwrap();

        let mut created = Vec::new();
        for i in 0..7 {
            let appt = ledger::open(
                &conn,
                &NewAppointment {
                    doctor_id: doctor.id,
                    patient_id: patient.id,
                    scheduled_at: at(10, 8) + Duration::hours(i),
                    reason: format!("visit {i}"),
                },
                at(2, 9) + Duration::minutes(i),
            )
            .unwrap();
            created.push(appt.id);
        }

        let ctx = RequestContext::open(&conn, &config, Some(admin_id), at(3, 9)).unwrap();
        let board = dashboard(&ctx).unwrap();
        assert_eq!(board.doctor_count, 1);
        assert_eq!(board.patient_count, 1);
        assert_eq!(board.appointment_count, 7);
        let recent: Vec<Uuid> = board.recent.iter().map(|d| d.appointment.id).collect();
        let expected: Vec<Uuid> = created.iter().rev().take(5).copied().collect();
        assert_eq!(recent, expected);
    }

    #[test]
    fn revise_and_delete_appointment() {
        let (conn, config, admin_id) = setup();
        let ctx = RequestContext::open(&conn, &config, Some(admin_id), at(2, 9)).unwrap();
        let doctor = create_doctor(&ctx, &doctor_draft()).unwrap();
        let patient = create_patient(&ctx, &patient_draft()).unwrap();
        let appt = book_appointment(
            &ctx,
            &NewAppointment {
                doctor_id: doctor.id,
                patient_id: patient.id,
                scheduled_at: at(5, 10),
                reason: "checkup".into(),
            },
        )
        .unwrap();

        let done = revise_appointment(
            &ctx,
            &appt.id,
            &AppointmentRevision {
                scheduled_at: appt.scheduled_at,
                reason: appt.reason.clone(),
                notes: Some("seen early".into()),
                status: AppointmentStatus::Completed,
            },
        )
        .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(list_appointments(&ctx).unwrap().len(), 1);

        assert!(matches!(
            delete_doctor(&ctx, &doctor.id),
            Err(ClinicError::Validation(ValidationError::ProfileHasAppointments { .. }))
        ));
        delete_appointment(&ctx, &appt.id).unwrap();
        delete_doctor(&ctx, &doctor.id).unwrap();
        assert!(list_appointments(&ctx).unwrap().is_empty());
    }

    #[test]
    fn linkable_accounts_excludes_admins_and_linked() {
        let (conn, config, admin_id) = setup();
        let free =
            identity::register(&conn, &registration("free", "free@example.com"), FAST, at(1, 9))
                .unwrap();
        let taken =
            identity::register(&conn, &registration("taken", "taken@example.com"), FAST, at(1, 9))
                .unwrap();
        profiles::create_doctor(
            &conn,
            &DoctorDraft {
                account_id: Some(taken.id),
                ..doctor_draft()
            },
        )
        .unwrap();

        let ctx = RequestContext::open(&conn, &config, Some(admin_id), at(2, 9)).unwrap();
        let ids: Vec<Uuid> = linkable_accounts(&ctx).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![free.id]);
        assert_eq!(list_accounts(&ctx).unwrap().len(), 3);
    }

    #[test]
    fn non_admin_denied_console() {
        let (conn, config, _) = setup();
        let account =
            identity::register(&conn, &registration("bob", "bob@example.com"), FAST, at(1, 9))
                .unwrap();
        let ctx = RequestContext::open(&conn, &config, Some(account.id), at(2, 9)).unwrap();
        assert!(matches!(
            dashboard(&ctx),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));
        assert!(matches!(
            create_doctor(&ctx, &doctor_draft()),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));
    }

    #[test]
    fn patient_denied_console_profile_reads() {
        let (conn, config, _) = setup();
        let doctor = profiles::create_doctor(&conn, &doctor_draft()).unwrap();
        let account =
            identity::register(&conn, &registration("maria", "maria@example.com"), FAST, at(1, 9))
                .unwrap();
        let own = profiles::upsert_own_patient_profile(&conn, &account.id, &patient_draft(), at(1, 9))
            .unwrap();

        let ctx = RequestContext::open(&conn, &config, Some(account.id), at(2, 9)).unwrap();
        assert!(matches!(
            list_doctors(&ctx),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));
        assert!(matches!(
            get_doctor(&ctx, &doctor.id),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));
        assert!(matches!(
            get_patient(&ctx, &own.id),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));

        // Own booking through the console would skip the booking-window rules.
        let request = NewAppointment {
            doctor_id: doctor.id,
            patient_id: own.id,
            scheduled_at: at(7, 20),
            reason: "weekend slot".into(),
        };
        assert!(matches!(
            book_appointment(&ctx, &request),
            Err(ClinicError::Authorization(DenyReason::InsufficientRole))
        ));
        assert!(repo::list_appointments(&conn, &Default::default()).unwrap().is_empty());
    }
}
