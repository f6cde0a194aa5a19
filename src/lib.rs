//! Blur Authentication
//!
//! Authentication and session-credential service for the Blur community
//! backend providing:
//! - Member signup with unique email and nickname
//! - Argon2id password hashing
//! - JWT access and refresh tokens with refresh token rotation
//! - Time-boxed, single-use email verification and password-reset codes
//! - Nickname availability checks
//! - Role-based access control (basic, authenticated, admin)
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_ACCESS_EXPIRATION` - Access token expiration in seconds (default: 900)
//! - `JWT_REFRESH_EXPIRATION` - Refresh token expiration in seconds (default: 604800)
//! - `AUTH_CODE_TTL` - Verification code lifetime in seconds (default: 300)
//! - `DATABASE_URL` - PostgreSQL connection string (required by the server binary)
//! - `REDIS_URL` - Redis connection string (optional, in-memory cache otherwise)
//!
//! See [`AuthConfig`] and [`config::ServerConfig`] for the full list.
//!
//! # Usage
//!
//! ```rust,ignore
//! use blur_auth::{AuthConfig, AuthService, LogMailer, MemoryCache, PgAccountRepository};
//! use std::sync::Arc;
//!
//! let auth = Arc::new(AuthService::new(
//!     AuthConfig::from_env()?,
//!     Arc::new(PgAccountRepository::new(db_pool)),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(LogMailer),
//! )?);
//!
//! let app = blur_auth::create_routes(auth.clone());
//! let pair = auth.login(sign_in_request).await?;
//! ```

pub mod cache;
pub mod codes;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod sessions;
pub mod store;
pub mod tokens;

// Re-export commonly used types
pub use cache::{MemoryCache, Namespace, RedisCache, TtlCache};
pub use codes::CodePurpose;
pub use config::AuthConfig;
pub use error::{AuthError, FieldError};
pub use extractors::{AuthUser, ClientInfo, JsonBody};
pub use middleware::require_role;
pub use handlers::AuthState;
pub use mail::{LogMailer, Mailer, SmtpMailer};
pub use models::*;
pub use service::AuthService;
pub use store::{AccountRepository, MemoryAccountRepository, PgAccountRepository};
pub use tokens::TokenIssuer;

use axum::Router;

/// Create authentication routes
///
/// Mount the returned router into the application; all paths live under
/// `/v1/auth`.
pub fn create_routes(auth_service: AuthState) -> Router {
    handlers::create_routes(auth_service)
}
