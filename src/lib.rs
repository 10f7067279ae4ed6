pub mod access; // Access control gate
pub mod commands;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod identity; // Accounts, roles, principals
pub mod ledger; // Appointment lifecycle
pub mod models;
pub mod profiles; // Doctor and patient records
pub mod scheduling; // Booking-window policy
pub mod validation;

pub use error::{ClinicError, ValidationError};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
/// Later calls are no-ops, so hosts and tests may both call it.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
    }
}
