pub mod keys;

pub use keys::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Malformed stored credential")]
    MalformedCredential,

    #[error("Unsupported credential scheme: {0}")]
    UnsupportedScheme(String),
}
