//! Authentication Configuration
//!
//! All configuration values are loaded from environment variables.
//! No hardcoded secrets or sensitive data.

use crate::error::AuthError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Authentication configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// JWT access token expiration in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// JWT refresh token expiration in seconds (from JWT_REFRESH_EXPIRATION env var)
    pub refresh_token_expiration: i64,

    /// JWT issuer (from JWT_ISSUER env var)
    pub jwt_issuer: String,

    /// JWT audience (from JWT_AUDIENCE env var)
    pub jwt_audience: String,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Lifetime of an email or password-reset code in seconds (from AUTH_CODE_TTL env var)
    pub auth_code_ttl: i64,

    /// How long an issued code record stays in the cache, in seconds
    /// (from AUTH_CODE_RETENTION env var). Must be at least `auth_code_ttl`.
    pub auth_code_retention: i64,

    /// Wrong guesses a code survives before it is discarded
    /// (from AUTH_CODE_MAX_ATTEMPTS env var)
    pub auth_code_max_attempts: u32,

    /// Lifetime of a "verified" marker after a code was accepted, in seconds
    /// (from VERIFIED_MARKER_TTL env var)
    pub verified_marker_ttl: i64,

    /// Require a validated email code before signup (from REQUIRE_EMAIL_VERIFICATION env var)
    pub require_email_verification: bool,
}

impl AuthConfig {
    /// Configuration with default lifetimes and cost parameters.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_expiration: 900,     // 15 minutes
            refresh_token_expiration: 604800, // 7 days
            jwt_issuer: "blur".to_string(),
            jwt_audience: "blur-api".to_string(),
            argon2_memory_cost: 65536, // 64 MiB
            argon2_time_cost: 3,
            argon2_parallelism: 4,
            auth_code_ttl: 300,
            auth_code_retention: 600,
            auth_code_max_attempts: 5,
            verified_marker_ttl: 1800,
            require_email_verification: false,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| {
            AuthError::Config("JWT_SECRET environment variable must be set".to_string())
        })?;

        let defaults = Self::new(jwt_secret);

        Ok(Self {
            access_token_expiration: env_or(
                "JWT_ACCESS_EXPIRATION",
                defaults.access_token_expiration,
            ),
            refresh_token_expiration: env_or(
                "JWT_REFRESH_EXPIRATION",
                defaults.refresh_token_expiration,
            ),
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            argon2_memory_cost: env_or("ARGON2_MEMORY_COST", defaults.argon2_memory_cost),
            argon2_time_cost: env_or("ARGON2_TIME_COST", defaults.argon2_time_cost),
            argon2_parallelism: env_or("ARGON2_PARALLELISM", defaults.argon2_parallelism),
            auth_code_ttl: env_or("AUTH_CODE_TTL", defaults.auth_code_ttl),
            auth_code_retention: env_or("AUTH_CODE_RETENTION", defaults.auth_code_retention),
            auth_code_max_attempts: env_or(
                "AUTH_CODE_MAX_ATTEMPTS",
                defaults.auth_code_max_attempts,
            ),
            verified_marker_ttl: env_or("VERIFIED_MARKER_TTL", defaults.verified_marker_ttl),
            require_email_verification: env::var("REQUIRE_EMAIL_VERIFICATION")
                .ok()
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.require_email_verification),
            jwt_secret: defaults.jwt_secret,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(AuthError::Config(
                "JWT_REFRESH_EXPIRATION must be greater than JWT_ACCESS_EXPIRATION".to_string(),
            ));
        }

        if self.auth_code_ttl <= 0 {
            return Err(AuthError::Config("AUTH_CODE_TTL must be positive".to_string()));
        }

        if self.auth_code_retention < self.auth_code_ttl {
            return Err(AuthError::Config(
                "AUTH_CODE_RETENTION must not be shorter than AUTH_CODE_TTL".to_string(),
            ));
        }

        if self.auth_code_max_attempts == 0 {
            return Err(AuthError::Config(
                "AUTH_CODE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.verified_marker_ttl <= 0 {
            return Err(AuthError::Config(
                "VERIFIED_MARKER_TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Process-level settings for the server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Redis connection string (from REDIS_URL env var); in-memory cache when unset
    pub redis_url: Option<String>,

    /// Listen address (from BIND_ADDR env var)
    pub bind_addr: String,

    /// Outgoing mail settings; codes are only logged when unset
    pub smtp: Option<SmtpConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AuthError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            AuthError::Config("DATABASE_URL environment variable must be set".to_string())
        })?;

        Ok(Self {
            database_url,
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.is_empty()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            smtp: SmtpConfig::from_env(),
        })
    }
}

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `Blur <no-reply@blur.example>`
    pub from: String,
}

impl SmtpConfig {
    /// Returns `None` unless SMTP_HOST is set.
    pub fn from_env() -> Option<Self> {
        let host = env::var("SMTP_HOST").ok().filter(|v| !v.is_empty())?;
        let username = env::var("SMTP_USERNAME").unwrap_or_default();

        Some(Self {
            port: env_or("SMTP_PORT", 587),
            password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: env::var("MAIL_FROM").unwrap_or_else(|_| format!("Blur <{}>", username)),
            host,
            username,
        })
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Convert a positive second count into a `Duration`.
pub(crate) fn seconds(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}
