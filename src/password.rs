//! Argon2id password hashing
//!
//! Hashing is CPU and memory heavy, so the async entry points run it on the
//! blocking pool instead of a runtime worker.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tokio::task;

/// Salted one-way password hashing with the configured cost parameters
pub struct PasswordHasher {
    params: Params,
    /// Verified against when an account does not exist, so a miss costs
    /// as much as a wrong password.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {}", e)))?;

        let dummy_hash = hash_with(&argon2(&params), "blur-dummy-password")?;

        Ok(Self { params, dummy_hash })
    }

    /// Hash a password using Argon2id with a fresh random salt
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let argon2 = argon2(&self.params);
        let password = password.to_owned();

        task::spawn_blocking(move || hash_with(&argon2, &password))
            .await
            .map_err(join_error)?
    }

    /// Verify a password against a stored hash (constant-time comparison)
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let argon2 = argon2(&self.params);
        let password = password.to_owned();
        let hash = hash.to_owned();

        task::spawn_blocking(move || verify_with(&argon2, &password, &hash))
            .await
            .map_err(join_error)?
    }

    /// Burn one verification for a login attempt against an unknown email.
    pub async fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash).await;
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_with(argon2: &Argon2<'_>, password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::Internal)?;

    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn join_error(err: task::JoinError) -> AuthError {
    tracing::error!("Password hashing task failed: {:?}", err);
    AuthError::Internal
}
