use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

pub const KEY_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

/// Scheme tag written in front of every stored credential.
pub const CREDENTIAL_SCHEME: &str = "pbkdf2-sha256";

/// Derived credential bytes, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl DerivedKey {
    /// Derive from secret + salt using PBKDF2-SHA256
    fn derive(secret: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, iterations, &mut key_bytes);
        Self { key_bytes }
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// One-way credential for an account secret.
///
/// Format: `pbkdf2-sha256$<iterations>$<salt>$<hash>` (unpadded base64).
pub fn hash_secret(secret: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let key = DerivedKey::derive(secret, &salt, iterations);
    format!(
        "{CREDENTIAL_SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(key.key_bytes),
    )
}

/// Check a secret against a stored credential in constant time.
pub fn verify_secret(secret: &str, credential: &str) -> Result<bool, CryptoError> {
    let mut parts = credential.split('$');
    let (scheme, iterations, salt, expected) =
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(i), Some(salt), Some(hash), None) => (s, i, salt, hash),
            _ => return Err(CryptoError::MalformedCredential),
        };
    if scheme != CREDENTIAL_SCHEME {
        return Err(CryptoError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| CryptoError::MalformedCredential)?;
    if iterations == 0 {
        return Err(CryptoError::MalformedCredential);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedCredential)?;
    let mut expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedCredential)?;
    if expected.len() != KEY_LENGTH {
        expected.zeroize();
        return Err(CryptoError::MalformedCredential);
    }

    let derived = DerivedKey::derive(secret, &salt, iterations);
    let matches = derived.key_bytes[..].ct_eq(&expected[..]).unwrap_u8() == 1;
    expected.zeroize();
    Ok(matches)
}
