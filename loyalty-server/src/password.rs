//! Argon2 password hashing for user credentials.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
#[error("password hashing error: {0}")]
pub struct HashError(String);

/// Hash a plaintext password into a PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

/// Check a plaintext password against a stored PHC string.
///
/// A malformed stored hash never verifies.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking thread pool.
pub async fn hash_password_blocking(plaintext: String) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .map_err(|e| HashError(format!("spawn_blocking failed: {e}")))?
}

/// [`verify_password`] on the blocking thread pool.
pub async fn verify_password_blocking(
    plaintext: String,
    stored: String,
) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored))
        .await
        .map_err(|e| HashError(format!("spawn_blocking failed: {e}")))
}
