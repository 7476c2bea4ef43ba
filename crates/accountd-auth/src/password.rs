//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The hashing primitive could not complete
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    /// Verification failed for a reason other than a mismatch
    #[error("failed to verify password: {0}")]
    VerificationFailed(String),

    /// The stored hash is not a valid PHC string
    #[error("invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password using Argon2id with a freshly generated random salt.
///
/// Returns a PHC-formatted string suitable for storage. Two calls with the
/// same plaintext produce different outputs because the salt is random.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash string.
///
/// A wrong password is `Ok(false)`; a stored hash that cannot be parsed is
/// `InvalidHashFormat` so callers can tell a mismatch apart from a corrupt
/// record. Comparison is constant-time inside the argon2 crate.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
