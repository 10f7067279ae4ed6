//! Access control gate for every clinic operation.
//!
//! A request is an `(Action, Target)` pair checked once against the
//! principal's resolved role. Decisions come from `POLICY`, a static table
//! scanned top to bottom; the first row matching role, action and target
//! decides. Unmatched requests are denied: `NoProfile` for an account
//! without a profile asking for something a patient may do,
//! `InsufficientRole` otherwise.
//!
//! Ownership rows compare the target's profile reference with the profile
//! carried in the principal's role, so no store lookup happens here. Callers
//! load the target record first and describe it with `Target`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::{Principal, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Create,
    Update,
    Cancel,
    Delete,
}

/// What an operation touches, with the references ownership rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// An existing appointment.
    Appointment { doctor_id: Uuid, patient_id: Uuid },
    /// An appointment about to be booked for this patient.
    NewAppointment { patient_id: Uuid },
    /// Doctor records (directory, booking candidates, admin management).
    Doctor,
    /// One patient record.
    Patient { patient_id: Uuid },
    /// The caller's own patient profile, including its first creation.
    OwnPatientProfile,
    PatientWorkspace,
    DoctorWorkspace,
    AdminConsole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Appointment,
    NewAppointment,
    Doctor,
    Patient,
    OwnPatientProfile,
    PatientWorkspace,
    DoctorWorkspace,
    AdminConsole,
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Appointment { .. } => TargetKind::Appointment,
            Self::NewAppointment { .. } => TargetKind::NewAppointment,
            Self::Doctor => TargetKind::Doctor,
            Self::Patient { .. } => TargetKind::Patient,
            Self::OwnPatientProfile => TargetKind::OwnPatientProfile,
            Self::PatientWorkspace => TargetKind::PatientWorkspace,
            Self::DoctorWorkspace => TargetKind::DoctorWorkspace,
            Self::AdminConsole => TargetKind::AdminConsole,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Administrator,
    Doctor,
    Patient,
    Unlinked,
}

impl From<Role> for RoleKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Administrator => Self::Administrator,
            Role::Doctor(_) => Self::Doctor,
            Role::Patient(_) => Self::Patient,
            Role::Unlinked => Self::Unlinked,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    #[error("Sign in required")]
    Unauthenticated,

    #[error("Complete your patient profile first")]
    NoProfile,

    #[error("This record belongs to someone else")]
    NotOwner,

    #[error("Your role does not permit this operation")]
    InsufficientRole,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NoProfile => "NO_PROFILE",
            Self::NotOwner => "NOT_OWNER",
            Self::InsufficientRole => "INSUFFICIENT_ROLE",
        }
    }
}

/// Which rule let the request through, for the log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Administrator,
    OwnRecord,
    RoleGrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow(AllowReason),
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

// ═══════════════════════════════════════════════════════════
// Policy table
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum Grant {
    Always,
    /// Target's doctor reference equals the principal's doctor profile.
    DoctorOwns,
    /// Target's patient reference equals the principal's patient profile.
    PatientOwns,
}

struct Rule {
    role: RoleKind,
    /// `None` matches every action.
    actions: Option<&'static [Action]>,
    /// `None` matches every target.
    target: Option<TargetKind>,
    grant: Grant,
}

const READ: &[Action] = &[Action::Read];
const READ_UPDATE: &[Action] = &[Action::Read, Action::Update];
const READ_CANCEL: &[Action] = &[Action::Read, Action::Cancel];
const CREATE: &[Action] = &[Action::Create];
const PROFILE_FORM: &[Action] = &[Action::Read, Action::Create, Action::Update];

const fn rule(
    role: RoleKind,
    actions: &'static [Action],
    target: TargetKind,
    grant: Grant,
) -> Rule {
    Rule {
        role,
        actions: Some(actions),
        target: Some(target),
        grant,
    }
}

static POLICY: &[Rule] = &[
    Rule {
        role: RoleKind::Administrator,
        actions: None,
        target: None,
        grant: Grant::Always,
    },
    // Doctors
    rule(RoleKind::Doctor, READ, TargetKind::DoctorWorkspace, Grant::Always),
    rule(RoleKind::Doctor, READ_UPDATE, TargetKind::Appointment, Grant::DoctorOwns),
    // Patients
    rule(RoleKind::Patient, READ, TargetKind::PatientWorkspace, Grant::Always),
    rule(RoleKind::Patient, READ_CANCEL, TargetKind::Appointment, Grant::PatientOwns),
    rule(RoleKind::Patient, CREATE, TargetKind::NewAppointment, Grant::PatientOwns),
    rule(RoleKind::Patient, READ, TargetKind::Doctor, Grant::Always),
    rule(RoleKind::Patient, READ, TargetKind::Patient, Grant::PatientOwns),
    rule(RoleKind::Patient, PROFILE_FORM, TargetKind::OwnPatientProfile, Grant::Always),
    // Accounts with no profile yet may only fill in the patient form.
    rule(RoleKind::Unlinked, PROFILE_FORM, TargetKind::OwnPatientProfile, Grant::Always),
];

impl Rule {
    fn matches(&self, role: RoleKind, action: Action, target: TargetKind) -> bool {
        self.role == role
            && self.actions.map_or(true, |actions| actions.contains(&action))
            && self.target.map_or(true, |t| t == target)
    }
}

/// Whether some patient is allowed this request: an account without a
/// profile is then told to create one rather than refused outright.
fn patient_could(action: Action, target: TargetKind) -> bool {
    POLICY
        .iter()
        .any(|rule| rule.matches(RoleKind::Patient, action, target))
}

fn owning_doctor(target: &Target) -> Option<Uuid> {
    match target {
        Target::Appointment { doctor_id, .. } => Some(*doctor_id),
        _ => None,
    }
}

fn owning_patient(target: &Target) -> Option<Uuid> {
    match target {
        Target::Appointment { patient_id, .. }
        | Target::NewAppointment { patient_id }
        | Target::Patient { patient_id } => Some(*patient_id),
        _ => None,
    }
}

fn apply(grant: Grant, role: Role, target: &Target) -> AccessDecision {
    let owned = match grant {
        Grant::Always => {
            return AccessDecision::Allow(if role == Role::Administrator {
                AllowReason::Administrator
            } else {
                AllowReason::RoleGrant
            })
        }
        Grant::DoctorOwns => role.doctor_id().is_some() && role.doctor_id() == owning_doctor(target),
        Grant::PatientOwns => {
            role.patient_id().is_some() && role.patient_id() == owning_patient(target)
        }
    };
    if owned {
        AccessDecision::Allow(AllowReason::OwnRecord)
    } else {
        AccessDecision::Deny(DenyReason::NotOwner)
    }
}

// ═══════════════════════════════════════════════════════════
// Decision
// ═══════════════════════════════════════════════════════════

/// Decide a request. Pure; never touches the store.
pub fn decide(principal: &Principal, action: Action, target: &Target) -> AccessDecision {
    let Some(role) = principal.role() else {
        return AccessDecision::Deny(DenyReason::Unauthenticated);
    };
    let kind = RoleKind::from(role);
    let target_kind = target.kind();

    match POLICY
        .iter()
        .find(|rule| rule.matches(kind, action, target_kind))
    {
        Some(rule) => apply(rule.grant, role, target),
        None if kind == RoleKind::Unlinked && patient_could(action, target_kind) => {
            AccessDecision::Deny(DenyReason::NoProfile)
        }
        None => AccessDecision::Deny(DenyReason::InsufficientRole),
    }
}

/// Gate an operation: `Ok` to proceed, or the reason it may not.
pub fn authorize(principal: &Principal, action: Action, target: &Target) -> Result<(), DenyReason> {
    match decide(principal, action, target) {
        AccessDecision::Allow(reason) => {
            tracing::debug!(?action, ?target, ?reason, "Access granted");
            Ok(())
        }
        AccessDecision::Deny(reason) => {
            tracing::warn!(
                account_id = ?principal.account_id(),
                ?action,
                ?target,
                reason = reason.code(),
                "Access denied"
            );
            Err(reason)
        }
    }
}
