//! Salted password hashing
//!
//! Stored passwords are Argon2id PHC strings. The salt is kept in its own
//! column as well, so re-hashing with the stored salt reproduces the value.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};

/// Hash a plaintext password with the given salt.
///
/// # Examples
/// ```
/// use cmswire::application::password::{hash_password, new_salt};
///
/// let salt = new_salt();
/// let a = hash_password(&salt, "secret").unwrap();
/// assert_eq!(a, hash_password(&salt, "secret").unwrap());
/// assert!(a.starts_with("$argon2id$"));
/// ```
pub fn hash_password(salt: &str, plain: &str) -> ApplicationResult<String> {
    let salt = SaltString::from_b64(salt).map_err(|e| failed("parse password salt", e))?;
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| failed("hash password", e))
}

/// Random salt for a new password (32 hex digits, valid B64).
pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Check `plain` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn failed(context: &str, e: argon2::password_hash::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context: context.to_string(),
        source: e.to_string().into(),
    }
}
