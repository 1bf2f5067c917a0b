use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use validator::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Hash a password using `Argon2id`.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
}

/// Check a password against a stored `Argon2id` hash.
///
/// # Errors
///
/// Returns an error if the stored hash cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// `validator` rule for new passwords: 8 to 128 characters, not only whitespace.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the broken rule.
pub fn password_policy(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if password.trim().is_empty() || len < MIN_PASSWORD_LEN {
        return Err(ValidationError::new("password_too_short")
            .with_message("Password must be at least 8 characters.".into()));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::new("password_too_long")
            .with_message("Password must be at most 128 characters.".into()));
    }
    Ok(())
}
