//! Sign-up and sign-in. Session storage belongs to the caller; these
//! commands only hand back the account and where it should land.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;

use crate::config::ClinicConfig;
use crate::error::ClinicError;
use crate::identity::{self, Registration, Role};
use crate::models::Account;

/// First screen after signing in, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Landing {
    AdminConsole,
    DoctorWorkspace,
    PatientWorkspace,
    /// Signed in but no profile yet: the patient profile form.
    PatientProfileForm,
}

impl From<Role> for Landing {
    fn from(role: Role) -> Self {
        match role {
            Role::Administrator => Self::AdminConsole,
            Role::Doctor(_) => Self::DoctorWorkspace,
            Role::Patient(_) => Self::PatientWorkspace,
            Role::Unlinked => Self::PatientProfileForm,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub account: Account,
    pub role: Role,
    pub landing: Landing,
}

pub fn sign_up(
    conn: &Connection,
    config: &ClinicConfig,
    registration: &Registration,
    now: NaiveDateTime,
) -> Result<Account, ClinicError> {
    identity::register(conn, registration, config.credential_iterations, now)
}

pub fn sign_in(conn: &Connection, username: &str, secret: &str) -> Result<SignedIn, ClinicError> {
    let account = identity::authenticate(conn, username, secret)?;
    let role = identity::role_of(conn, &account)?;
    tracing::info!(account_id = %account.id, ?role, "Signed in");
    Ok(SignedIn {
        account,
        role,
        landing: role.into(),
    })
}
