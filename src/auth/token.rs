/// Opaque Token Generation
///
/// Tokens are 16 bytes from the OS random source, base32-encoded without
/// padding (always 26 characters). Only their SHA-256 digest is ever stored.

use chrono::{Duration, Utc};
use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::domain::NewToken;
use crate::error::AppError;

/// Length of every plaintext token, in characters.
pub const TOKEN_LENGTH: usize = 26;

const TOKEN_ENTROPY_BYTES: usize = 16;

/// Generate a new plaintext token and its digest
///
/// # Errors
/// Returns `AppError::Randomness` if the OS random source is unavailable
pub fn generate_plaintext() -> Result<(String, Vec<u8>), AppError> {
    let mut random_bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut random_bytes)
        .map_err(|e| AppError::Randomness(e.to_string()))?;

    let plaintext = BASE32_NOPAD.encode(&random_bytes);
    let digest = hash_token(&plaintext);

    Ok((plaintext, digest))
}

/// SHA-256 of the plaintext's bytes. Deterministic, so a presented token can
/// be looked up by recomputing it.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Generate a token for `user_id` that expires `ttl` from now.
pub fn generate_token(user_id: i64, ttl: Duration) -> Result<NewToken, AppError> {
    let (plaintext, token_hash) = generate_plaintext()?;

    Ok(NewToken {
        user_id,
        plaintext,
        token_hash,
        expiry: Utc::now() + ttl,
    })
}
