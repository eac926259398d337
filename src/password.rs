//! Argon2id password hashing for vendor and admin credentials.
//!
//! Hashing is CPU-bound, so the async wrappers run it on the blocking pool.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(argon2::password_hash::Error),
    #[error("password task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<PasswordError> for ApiError {
    fn from(error: PasswordError) -> Self {
        tracing::error!(error = %error, "Password hashing failed");
        anyhow::Error::new(error).into()
    }
}

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

/// Checks `password` against a stored PHC string.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(PasswordError::MalformedHash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(PasswordError::Hash(err)),
    }
}

pub(crate) static ABSENT_ACCOUNT_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Spends one full Argon2 verification on a login for an unknown account, so it
/// costs the same as a wrong password. Always `false`.
pub fn verify_absent_account(password: &str) -> bool {
    let stored = ABSENT_ACCOUNT_HASH.get_or_init(|| hash_password("absent-account").ok());
    match stored {
        Some(hash) => {
            let _ = verify_password(password, hash);
        }
        None => {
            let _ = hash_password(password);
        }
    }
    false
}

pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

pub async fn verify_password_blocking(
    password: String,
    stored_hash: String,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await?
}

pub async fn verify_absent_account_blocking(password: String) -> Result<bool, PasswordError> {
    Ok(tokio::task::spawn_blocking(move || verify_absent_account(&password)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_plaintext_and_verifies() {
        let hash = hash_password("correct horse battery").unwrap();

        assert_ne!(hash, "correct horse battery");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("same-password").unwrap();
        let second = hash_password("same-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn absent_account_never_verifies() {
        assert!(!verify_absent_account("absent-account"));
        assert!(!verify_absent_account("anything else"));
        assert!(ABSENT_ACCOUNT_HASH.get().is_some_and(Option::is_some));
    }

    #[tokio::test]
    async fn blocking_wrappers_roundtrip() {
        let hash = hash_password_blocking("vendor-pass-1".to_string())
            .await
            .unwrap();
        assert!(
            verify_password_blocking("vendor-pass-1".to_string(), hash)
                .await
                .unwrap()
        );
    }
}
