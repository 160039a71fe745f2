/// Password Hashing and Verification
///
/// bcrypt with a fixed work factor. The encoded hash carries its own salt and
/// cost, so verification needs nothing but the stored string.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Work factor for every newly hashed password.
pub const PASSWORD_COST: u32 = 12;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `AppError::Hashing` if the password is longer than
/// `MAX_PASSWORD_BYTES` or bcrypt fails internally
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Hashing(format!(
            "password exceeds {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }

    hash(password, PASSWORD_COST).map_err(|e| AppError::Hashing(e.to_string()))
}

/// Verify a password against its stored hash
///
/// A mismatch is `Ok(false)`, as is any password too long to have been
/// hashed. Only an unparseable stored hash is an error.
///
/// # Errors
/// Returns `AppError::Hashing` if `hash` is not a valid bcrypt string
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }

    verify(password, hash).map_err(|e| AppError::Hashing(e.to_string()))
}
