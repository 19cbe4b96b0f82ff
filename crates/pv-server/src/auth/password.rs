//! Password hashing and verification using argon2id.

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 12;

/// Longest accepted password, in characters.
pub const MAX_PASSWORD_CHARS: usize = 64;

/// Hash verified when a login names an unknown user, so that the response
/// takes as long as a real verification.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("pv-unknown-user-placeholder").ok());

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error(
        "Password must be between {MIN_PASSWORD_CHARS} and {MAX_PASSWORD_CHARS} characters"
    )]
    Policy,

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Enforce the password length policy.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        Ok(())
    } else {
        Err(PasswordError::Policy)
    }
}

/// Validate and hash a new password off the async runtime.
pub async fn hash_new_password(password: String) -> Result<String, PasswordError> {
    validate_password(&password)?;
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a login password off the async runtime.
///
/// With no stored hash the password is checked against a placeholder and
/// the result is always `false`.
pub async fn check_password(
    password: String,
    stored: Option<String>,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(&password, dummy);
            }
            Ok(false)
        }
    })
    .await
    .map_err(|e| PasswordError::Hash(e.to_string()))?
    .map_err(|e| PasswordError::Hash(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("mysecret-long-enough").unwrap();
        assert!(verify_password("mysecret-long-enough", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let h1 = hash_password("password1").unwrap();
        let h2 = hash_password("password1").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn length_policy_counts_characters() {
        assert!(validate_password(&"a".repeat(11)).is_err());
        assert!(validate_password(&"a".repeat(12)).is_ok());
        assert!(validate_password(&"a".repeat(64)).is_ok());
        assert!(validate_password(&"a".repeat(65)).is_err());
        // 12 characters, 24 bytes.
        assert!(validate_password(&"ä".repeat(12)).is_ok());
    }

    #[tokio::test]
    async fn short_password_is_not_hashed() {
        let err = hash_new_password("short".into()).await.unwrap_err();
        assert!(matches!(err, PasswordError::Policy));
    }

    #[tokio::test]
    async fn check_against_stored_and_missing_hash() {
        let password = "correct horse battery";
        let hash = hash_new_password(password.into()).await.unwrap();
        let check = |attempt: &str, stored: Option<&str>| {
            check_password(attempt.to_string(), stored.map(str::to_string))
        };

        assert!(check(password, Some(&hash)).await.unwrap());
        assert!(!check("wrong horse battery", Some(&hash)).await.unwrap());
        assert!(!check(password, None).await.unwrap());
    }
}
