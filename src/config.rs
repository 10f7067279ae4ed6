use std::path::{Path, PathBuf};

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ClinicDesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// PBKDF2 rounds for account credentials.
pub const DEFAULT_CREDENTIAL_ITERATIONS: u32 = 600_000;

/// Upper bound on the booking lead time: one leap year.
pub const MAX_LEAD_TIME_HOURS: i64 = 366 * 24;

/// Get the application data directory
/// ~/ClinicDesk/ on all platforms, falling back to the working directory
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Location of the clinic database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinicdesk.db")
}

/// Log filter used when `RUST_LOG` is not set
pub fn default_log_filter() -> &'static str {
    "clinicdesk_lib=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Booking-window rules applied to patient self-service bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Minimum gap between "now" and the proposed start, in hours.
    pub minimum_lead_time_hours: i64,
    /// First bookable start hour (inclusive, 24h clock).
    pub business_open_hour: u32,
    /// Closing hour (exclusive): the last bookable start hour is one less.
    pub business_close_hour: u32,
    pub weekend_days: Vec<Weekday>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            minimum_lead_time_hours: 24,
            business_open_hour: 8,
            business_close_hour: 18,
            weekend_days: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

/// Appointment state-machine knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// When set, administrators may move an appointment out of a terminal
    /// status (Completed/Cancelled). Off by default: terminal means terminal.
    pub admin_status_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    pub scheduling: SchedulingConfig,
    pub ledger: LedgerConfig,
    pub credential_iterations: u32,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            scheduling: SchedulingConfig::default(),
            ledger: LedgerConfig::default(),
            credential_iterations: DEFAULT_CREDENTIAL_ITERATIONS,
        }
    }
}

impl ClinicConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduling;
        if s.minimum_lead_time_hours < 0 {
            return Err(ConfigError::Invalid(
                "minimum_lead_time_hours must not be negative".into(),
            ));
        }
        if s.minimum_lead_time_hours > MAX_LEAD_TIME_HOURS {
            return Err(ConfigError::Invalid(format!(
                "minimum_lead_time_hours {} exceeds {MAX_LEAD_TIME_HOURS}",
                s.minimum_lead_time_hours
            )));
        }
        if s.business_close_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "business_close_hour {} is past midnight",
                s.business_close_hour
            )));
        }
        if s.business_open_hour >= s.business_close_hour {
            return Err(ConfigError::Invalid(format!(
                "business hours [{}, {}) are empty",
                s.business_open_hour, s.business_close_hour
            )));
        }
        if self.credential_iterations == 0 {
            return Err(ConfigError::Invalid(
                "credential_iterations must be positive".into(),
            ));
        }
        Ok(())
    }
}
