//! Request-scoped operations, one module per audience.
//!
//! Every command takes a `RequestContext`, asks the access gate first,
//! then runs the scheduling policy and ledger as needed. Results are plain
//! data for the presentation layer; failures are a single `ClinicError`.

pub mod admin;
pub mod auth;
pub mod doctor;
pub mod patient;

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use uuid::Uuid;

use crate::access::{self, Action, DenyReason, Target};
use crate::config::ClinicConfig;
use crate::error::ClinicError;
use crate::identity::{self, Principal, Role};
use crate::ledger::Actor;

/// Everything one request needs: the store handle, who is asking, the
/// clinic rules, and the moment the request is evaluated at.
pub struct RequestContext<'a> {
    pub conn: &'a Connection,
    pub principal: Principal,
    pub config: &'a ClinicConfig,
    pub now: NaiveDateTime,
}

impl<'a> RequestContext<'a> {
    /// Resolve the session's account into a principal, once.
    pub fn open(
        conn: &'a Connection,
        config: &'a ClinicConfig,
        session_account: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<Self, ClinicError> {
        let principal = identity::resolve_principal(conn, session_account)?;
        Ok(Self {
            conn,
            principal,
            config,
            now: now.trunc_subsecs(0),
        })
    }

    pub fn authorize(&self, action: Action, target: &Target) -> Result<(), ClinicError> {
        access::authorize(&self.principal, action, target).map_err(ClinicError::from)
    }

    pub fn role(&self) -> Option<Role> {
        self.principal.role()
    }

    pub(crate) fn account_id(&self) -> Result<Uuid, ClinicError> {
        self.principal
            .account_id()
            .ok_or(ClinicError::Authorization(DenyReason::Unauthenticated))
    }

    /// Ledger actor for the current role. Only called after the gate allowed
    /// an appointment mutation, which no unlinked account passes.
    pub(crate) fn actor(&self) -> Result<Actor, ClinicError> {
        match self.role() {
            Some(Role::Administrator) => Ok(Actor::Administrator),
            Some(Role::Doctor(_)) => Ok(Actor::Doctor),
            Some(Role::Patient(_)) => Ok(Actor::Patient),
            Some(Role::Unlinked) => Err(DenyReason::NoProfile.into()),
            None => Err(DenyReason::Unauthenticated.into()),
        }
    }
}

/// Describe an appointment to the gate.
pub(crate) fn appointment_target(appointment: &crate::models::Appointment) -> Target {
    Target::Appointment {
        doctor_id: appointment.doctor_id,
        patient_id: appointment.patient_id,
    }
}
