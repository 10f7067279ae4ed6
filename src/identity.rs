//! Identity registry: accounts, credentials, and role resolution.
//!
//! An account may carry the administrator flag and may be linked to one
//! doctor or one patient profile. The effective role is resolved once per
//! request, by priority: Administrator > Doctor > Patient > Unlinked.

use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto;
use crate::db::repository as repo;
use crate::error::{ClinicError, ValidationError};
use crate::models::Account;
use crate::validation;

/// The one role an account acts under, with the profile it acts through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Doctor(Uuid),
    Patient(Uuid),
    Unlinked,
}

impl Role {
    pub fn doctor_id(&self) -> Option<Uuid> {
        match self {
            Self::Doctor(id) => Some(*id),
            _ => None,
        }
    }

    pub fn patient_id(&self) -> Option<Uuid> {
        match self {
            Self::Patient(id) => Some(*id),
            _ => None,
        }
    }
}

/// Who is asking. Built by the session layer from an account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    Anonymous,
    Authenticated { account_id: Uuid, role: Role },
}

impl Principal {
    pub fn account_id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { account_id, .. } => Some(*account_id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Sign-up form contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub secret: String,
    pub confirm_secret: String,
}

/// Create a non-administrator account.
pub fn register(
    conn: &Connection,
    registration: &Registration,
    iterations: u32,
    now: NaiveDateTime,
) -> Result<Account, ClinicError> {
    if registration.secret.is_empty() {
        return Err(ValidationError::field("password", "is required").into());
    }
    if registration.secret != registration.confirm_secret {
        return Err(ValidationError::field("confirm_password", "does not match").into());
    }
    create_account(
        conn,
        &registration.username,
        &registration.email,
        &registration.secret,
        false,
        iterations,
        now,
    )
}

fn create_account(
    conn: &Connection,
    username: &str,
    email: &str,
    secret: &str,
    is_admin: bool,
    iterations: u32,
    now: NaiveDateTime,
) -> Result<Account, ClinicError> {
    let username = validation::username(username)?;
    let email = validation::email("email", email)?;

    if repo::get_account_by_username(conn, &username)?.is_some() {
        return Err(ClinicError::DuplicateIdentity { field: "username" });
    }
    if repo::get_account_by_email(conn, &email)?.is_some() {
        return Err(ClinicError::DuplicateIdentity { field: "email" });
    }

    let account = Account {
        id: Uuid::new_v4(),
        username,
        email,
        credential: crypto::hash_secret(secret, iterations),
        is_admin,
        created_at: now.trunc_subsecs(0),
    };

    // A concurrent registration can still win the race between the checks
    // above and this insert; the UNIQUE indexes settle it.
    if let Err(err) = repo::insert_account(conn, &account) {
        if err.is_unique_violation() {
            let field = if repo::get_account_by_username(conn, &account.username)?.is_some() {
                "username"
            } else {
                "email"
            };
            return Err(ClinicError::DuplicateIdentity { field });
        }
        return Err(err.into());
    }

    tracing::info!(account_id = %account.id, is_admin, "Account registered");
    Ok(account)
}

/// Verify a username/secret pair.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    secret: &str,
) -> Result<Account, ClinicError> {
    let Some(account) = repo::get_account_by_username(conn, username)? else {
        tracing::warn!("Login attempt for unknown username");
        return Err(ClinicError::InvalidCredentials);
    };
    if !crypto::verify_secret(secret, &account.credential)? {
        tracing::warn!(account_id = %account.id, "Login attempt with wrong password");
        return Err(ClinicError::InvalidCredentials);
    }
    tracing::debug!(account_id = %account.id, "Account authenticated");
    Ok(account)
}

/// Effective role of an account, by priority.
pub fn role_of(conn: &Connection, account: &Account) -> Result<Role, ClinicError> {
    if account.is_admin {
        return Ok(Role::Administrator);
    }
    let (doctor, patient) = repo::get_account_links(conn, &account.id)?;
    Ok(match (doctor, patient) {
        (Some(doctor_id), _) => Role::Doctor(doctor_id),
        (None, Some(patient_id)) => Role::Patient(patient_id),
        (None, None) => Role::Unlinked,
    })
}

/// Build the request principal from the session's account id.
/// A session pointing at a deleted account is treated as anonymous.
pub fn resolve_principal(
    conn: &Connection,
    account_id: Option<Uuid>,
) -> Result<Principal, ClinicError> {
    let Some(account_id) = account_id else {
        return Ok(Principal::Anonymous);
    };
    match repo::get_account(conn, &account_id)? {
        Some(account) => Ok(Principal::Authenticated {
            account_id,
            role: role_of(conn, &account)?,
        }),
        None => {
            tracing::warn!(%account_id, "Session refers to a missing account");
            Ok(Principal::Anonymous)
        }
    }
}

/// Create the initial administrator unless an account with that email exists.
/// Returns the new account, or `None` when nothing was created.
pub fn bootstrap_administrator(
    conn: &Connection,
    username: &str,
    email: &str,
    secret: &str,
    iterations: u32,
    now: NaiveDateTime,
) -> Result<Option<Account>, ClinicError> {
    if repo::get_account_by_email(conn, email)?.is_some() {
        tracing::info!("Administrator already exists, skipping bootstrap");
        return Ok(None);
    }
    if secret.is_empty() {
        return Err(ValidationError::field("password", "is required").into());
    }
    create_account(conn, username, email, secret, true, iterations, now).map(Some)
}

/// Remove an account. Profiles it was linked to stay, unlinked.
pub fn delete_account(conn: &Connection, account_id: &Uuid) -> Result<(), ClinicError> {
    repo::delete_account(conn, account_id)?;
    tracing::info!(%account_id, "Account deleted");
    Ok(())
}
