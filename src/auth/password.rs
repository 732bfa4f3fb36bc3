use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::errors::PasswordError;

/// Hashes `plain` with Argon2id under a fresh random salt. The result is a PHC
/// string carrying the salt and cost parameters.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.is_empty() {
        return Err(PasswordError::InvalidInput("empty password"));
    }
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns `true` iff `hash` was produced by [`hash_password`] from `plain`.
/// A hash that does not parse is treated as a mismatch.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "argon2 parse hash error");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

lazy_static! {
    /// Real PHC hash burned on login misses so unknown usernames cost a full verify.
    static ref DUMMY_HASH: Option<String> = hash_password("userbase-dummy-password").ok();
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn spawn_hash(plain: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| {
            error!(error = %e, "hash task failed");
            PasswordError::Hash(e.to_string())
        })?
}

/// Runs [`verify_password`] on the blocking pool. With no stored hash the
/// plaintext is checked against a dummy hash and the result is always `false`.
pub async fn spawn_verify(plain: String, hash: Option<String>) -> bool {
    let task = tokio::task::spawn_blocking(move || match hash {
        Some(h) => verify_password(&plain, &h),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&plain, dummy);
            }
            false
        }
    });
    match task.await {
        Ok(ok) => ok,
        Err(e) => {
            error!(error = %e, "verify task failed");
            false
        }
    }
}
