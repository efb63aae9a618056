use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Hash a plaintext password with Argon2id (v19, default cost parameters)
/// and a fresh random salt. Returns the PHC string, which embeds the
/// algorithm, version, parameters and salt.
pub fn hash(plaintext: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| HashError(e.to_string()))?
        .to_string();

    if hashed.is_empty() {
        return Err(HashError("empty hash output".into()));
    }
    Ok(hashed)
}

/// Check a plaintext password against a stored PHC string.
///
/// Any mismatch yields `false`, including a stored hash that does not parse.
/// The digest comparison inside `argon2` is constant-time.
pub fn verify(plaintext: &str, hashed: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}
