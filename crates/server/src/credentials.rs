//! Credential verification behind the login endpoint.
//!
//! The login flow only depends on [`CredentialVerifier`]; [`Argon2Credentials`] is the
//! built-in table of Argon2id PHC hashes loaded from configuration.

use crate::config::UserCredentialConfig;
use crate::error::CredentialError;
use crate::model::user::normalize_email;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// External authenticator contract.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Check `password` for `email`. Returns the canonical email on success.
    async fn verify(&self, email: &str, password: &str) -> Result<String, CredentialError>;
}

/// Hash a password using Argon2id.
///
/// Returns the PHC-formatted hash string suitable for the `users` configuration list.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[derive(Clone, Debug, Default)]
pub struct Argon2Credentials {
    hashes: Arc<HashMap<String, String>>,
}

impl Argon2Credentials {
    pub fn new(users: &[UserCredentialConfig]) -> Self {
        let hashes = users
            .iter()
            .map(|u| (normalize_email(&u.email), u.password_hash.clone()))
            .collect();
        Self {
            hashes: Arc::new(hashes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for Argon2Credentials {
    async fn verify(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let email = normalize_email(email);
        let Some(hash) = self.hashes.get(&email).cloned() else {
            tracing::debug!(%email, "login for unknown email");
            return Err(CredentialError::InvalidCredentials);
        };

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| CredentialError::Backend(e.to_string()))?;

        if matches {
            Ok(email)
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }
}
