//! Outcome taxonomy for every operation that crosses the core boundary.
//!
//! Callers get either the success value or exactly one of these kinds;
//! `code()` gives the presentation layer a stable string to branch on.

use thiserror::Error;
use uuid::Uuid;

use crate::access::DenyReason;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::ledger::TransitionError;
use crate::scheduling::SchedulingRejection;

/// Recoverable input problems, each with a specific reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    Scheduling(SchedulingRejection),

    #[error("Invalid {field}: {reason}")]
    Field { field: &'static str, reason: String },

    #[error("Doctor {0} is not accepting appointments")]
    DoctorUnavailable(Uuid),

    #[error("The doctor already has an appointment at that time")]
    SlotTaken,

    #[error("Account {0} is already linked to a profile")]
    AccountAlreadyLinked(Uuid),

    #[error("Administrator accounts cannot be linked to a profile")]
    AdministratorNotLinkable,

    #[error("{entity_type} still has {count} appointment(s)")]
    ProfileHasAppointments { entity_type: &'static str, count: i64 },
}

impl ValidationError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Scheduling(rejection) => rejection.code(),
            Self::Field { .. } => "INVALID_FIELD",
            Self::DoctorUnavailable(_) => "DOCTOR_UNAVAILABLE",
            Self::SlotTaken => "SLOT_TAKEN",
            Self::AccountAlreadyLinked(_) => "ACCOUNT_ALREADY_LINKED",
            Self::AdministratorNotLinkable => "ADMINISTRATOR_NOT_LINKABLE",
            Self::ProfileHasAppointments { .. } => "PROFILE_HAS_APPOINTMENTS",
        }
    }
}

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Access denied: {0}")]
    Authorization(#[from] DenyReason),

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("An account with this {field} already exists")]
    DuplicateIdentity { field: &'static str },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Status change refused: {0}")]
    Transition(#[from] TransitionError),

    #[error("Persistence failure: {0}")]
    Persistence(DatabaseError),
}

impl ClinicError {
    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(v) => v.code(),
            Self::Authorization(reason) => reason.code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Transition(t) => t.code(),
            Self::Persistence(_) => "PERSISTENCE",
        }
    }

    /// Persistence failures end the request; everything else can be shown to the user.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Persistence(_))
    }
}

impl From<DatabaseError> for ClinicError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => Self::Persistence(other),
        }
    }
}

impl From<rusqlite::Error> for ClinicError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(DatabaseError::Sqlite(err))
    }
}

impl From<CryptoError> for ClinicError {
    fn from(err: CryptoError) -> Self {
        tracing::error!(error = %err, "Stored credential unusable");
        Self::Persistence(DatabaseError::ConstraintViolation(err.to_string()))
    }
}
