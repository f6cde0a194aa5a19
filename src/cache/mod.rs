//! Ephemeral key-value storage with per-key TTL
//!
//! Holds verification codes, "verified" markers and refresh-token records.
//! Every purpose writes under its own [`Namespace`] prefix so keys never
//! collide.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::error::AuthError;

use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-key expiry
#[async_trait]
pub trait TtlCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError>;

    /// Fetch a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    /// Remove an entry. Returns `true` only if a live entry was removed, so
    /// of several concurrent deletes exactly one observes `true`.
    async fn delete(&self, key: &str) -> Result<bool, AuthError>;

    /// Atomically increment a counter and return the new value. An absent
    /// counter starts at 1 and lives for `ttl`.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<u64, AuthError>;
}

/// Key prefixes, one per cached purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    EmailAuth,
    EmailAuthAttempts,
    EmailAvailable,
    PasswordAuth,
    PasswordAuthAttempts,
    PasswordChangeAvailable,
    RefreshToken,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::EmailAuth => "emailauth:",
            Namespace::EmailAuthAttempts => "emailauthAttempts:",
            Namespace::EmailAvailable => "validEmail:",
            Namespace::PasswordAuth => "passwordAuth:",
            Namespace::PasswordAuthAttempts => "passwordAuthAttempts:",
            Namespace::PasswordChangeAvailable => "validPasswordChange:",
            Namespace::RefreshToken => "refreshToken:",
        }
    }

    pub fn key(&self, id: impl std::fmt::Display) -> String {
        format!("{}{}", self.prefix(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_do_not_collide() {
        let all = [
            Namespace::EmailAuth,
            Namespace::EmailAuthAttempts,
            Namespace::EmailAvailable,
            Namespace::PasswordAuth,
            Namespace::PasswordAuthAttempts,
            Namespace::PasswordChangeAvailable,
            Namespace::RefreshToken,
        ];

        for a in all {
            for b in all {
                if a != b {
                    assert!(!a.prefix().starts_with(b.prefix()));
                    assert_ne!(a.key("a@x.com"), b.key("a@x.com"));
                }
            }
        }
    }

    #[test]
    fn test_key_format() {
        assert_eq!(Namespace::EmailAuth.key("a@x.com"), "emailauth:a@x.com");
        assert_eq!(
            Namespace::PasswordChangeAvailable.key("a@x.com"),
            "validPasswordChange:a@x.com"
        );
    }
}
