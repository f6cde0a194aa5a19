//! Time-boxed, single-use verification codes
//!
//! A code is a six-digit string bound to an email address and a
//! [`CodePurpose`]. It is stored as a JSON record carrying its own deadline;
//! the cache keeps the record somewhat longer than that deadline so a late
//! attempt can be told apart from a wrong or unknown code. Misses are
//! counted per email; the code is discarded once the configured limit is hit.
//!
//! Accepting a code deletes it and leaves a "verified" marker behind, which
//! signup (email purpose) or password reset (password purpose) later consume.

use crate::cache::{Namespace, TtlCache};
use crate::config::{seconds, AuthConfig};
use crate::error::AuthError;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a code proves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    /// Ownership of an email address before signup
    EmailVerification,
    /// Ownership of an account's email before a password reset
    PasswordReset,
}

impl CodePurpose {
    fn code_namespace(&self) -> Namespace {
        match self {
            CodePurpose::EmailVerification => Namespace::EmailAuth,
            CodePurpose::PasswordReset => Namespace::PasswordAuth,
        }
    }

    fn attempts_namespace(&self) -> Namespace {
        match self {
            CodePurpose::EmailVerification => Namespace::EmailAuthAttempts,
            CodePurpose::PasswordReset => Namespace::PasswordAuthAttempts,
        }
    }

    fn verified_namespace(&self) -> Namespace {
        match self {
            CodePurpose::EmailVerification => Namespace::EmailAvailable,
            CodePurpose::PasswordReset => Namespace::PasswordChangeAvailable,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CodeRecord {
    code: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct VerificationCodes {
    cache: Arc<dyn TtlCache>,
    code_ttl: i64,
    retention: i64,
    max_attempts: u32,
    marker_ttl: i64,
}

impl VerificationCodes {
    pub fn new(cache: Arc<dyn TtlCache>, config: &AuthConfig) -> Self {
        Self {
            cache,
            code_ttl: config.auth_code_ttl,
            retention: config.auth_code_retention,
            max_attempts: config.auth_code_max_attempts,
            marker_ttl: config.verified_marker_ttl,
        }
    }

    /// Create a new code for `email`, replacing any outstanding one of the
    /// same purpose.
    pub async fn issue(&self, purpose: CodePurpose, email: &str) -> Result<String, AuthError> {
        let code = generate_code();
        let issued_at = Utc::now();
        let record = CodeRecord {
            code: code.clone(),
            issued_at,
            expires_at: issued_at + Duration::seconds(self.code_ttl),
        };

        self.cache
            .put(
                &purpose.code_namespace().key(email),
                &serde_json::to_string(&record)?,
                seconds(self.retention),
            )
            .await?;
        self.cache
            .delete(&purpose.attempts_namespace().key(email))
            .await?;

        tracing::debug!(email, ?purpose, "Verification code issued");
        Ok(code)
    }

    /// Accept `code` for `email` exactly once.
    pub async fn validate(
        &self,
        purpose: CodePurpose,
        email: &str,
        code: &str,
    ) -> Result<(), AuthError> {
        let key = purpose.code_namespace().key(email);

        let record: CodeRecord = match self.cache.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => return Err(AuthError::InvalidCode),
        };

        if Utc::now() >= record.expires_at {
            self.cache.delete(&key).await?;
            return Err(AuthError::CodeExpired);
        }

        let attempts_key = purpose.attempts_namespace().key(email);

        if !codes_match(&record.code, code.trim()) {
            let misses = self
                .cache
                .incr(&attempts_key, seconds(self.retention))
                .await?;
            if misses >= u64::from(self.max_attempts) {
                self.cache.delete(&key).await?;
                self.cache.delete(&attempts_key).await?;
                tracing::warn!(
                    email,
                    ?purpose,
                    misses,
                    "Verification code discarded after repeated misses"
                );
            }
            return Err(AuthError::InvalidCode);
        }

        // A concurrent validation may have consumed it first.
        if !self.cache.delete(&key).await? {
            return Err(AuthError::InvalidCode);
        }
        self.cache.delete(&attempts_key).await?;

        self.cache
            .put(
                &purpose.verified_namespace().key(email),
                "true",
                seconds(self.marker_ttl),
            )
            .await?;

        tracing::debug!(email, ?purpose, "Verification code accepted");
        Ok(())
    }

    /// Spend the verified marker left by [`Self::validate`]. Exactly one
    /// caller observes `true` per marker.
    pub async fn consume_verified(
        &self,
        purpose: CodePurpose,
        email: &str,
    ) -> Result<bool, AuthError> {
        self.cache
            .delete(&purpose.verified_namespace().key(email))
            .await
    }
}

/// Six random decimal digits, zero-padded
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn codes_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn codes_with_ttl(ttl: i64) -> (Arc<MemoryCache>, VerificationCodes) {
        let cache = Arc::new(MemoryCache::new());
        let mut config = AuthConfig::new("a".repeat(32));
        config.auth_code_ttl = ttl;
        config.auth_code_retention = ttl * 10;
        (cache.clone(), VerificationCodes::new(cache, &config))
    }

    #[test]
    fn test_generate_code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("012345", "012345"));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", "01234"));
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let (_, codes) = codes_with_ttl(300);
        let code = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();

        codes
            .validate(CodePurpose::EmailVerification, "a@x.com", &code)
            .await
            .unwrap();
        assert!(matches!(
            codes
                .validate(CodePurpose::EmailVerification, "a@x.com", &code)
                .await,
            Err(AuthError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_original_valid() {
        let (_, codes) = codes_with_ttl(300);
        let code = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert!(matches!(
            codes
                .validate(CodePurpose::EmailVerification, "a@x.com", wrong)
                .await,
            Err(AuthError::InvalidCode)
        ));
        assert!(codes
            .validate(CodePurpose::EmailVerification, "a@x.com", &code)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_purposes_are_isolated() {
        let (_, codes) = codes_with_ttl(300);
        let code = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();

        assert!(matches!(
            codes.validate(CodePurpose::PasswordReset, "a@x.com", &code).await,
            Err(AuthError::InvalidCode)
        ));
        assert!(!codes
            .consume_verified(CodePurpose::EmailVerification, "a@x.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_expired_code() {
        let (_, codes) = codes_with_ttl(1);
        let code = codes.issue(CodePurpose::PasswordReset, "a@x.com").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        assert!(matches!(
            codes.validate(CodePurpose::PasswordReset, "a@x.com", &code).await,
            Err(AuthError::CodeExpired)
        ));
        // The expired record is gone afterwards.
        assert!(matches!(
            codes.validate(CodePurpose::PasswordReset, "a@x.com", &code).await,
            Err(AuthError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_reissue_replaces_code() {
        let (_, codes) = codes_with_ttl(300);
        let first = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        let mut second = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        while second == first {
            second = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        }

        assert!(matches!(
            codes
                .validate(CodePurpose::EmailVerification, "a@x.com", &first)
                .await,
            Err(AuthError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_marker_set_and_consumed() {
        let (cache, codes) = codes_with_ttl(300);
        let code = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        codes
            .validate(CodePurpose::EmailVerification, "a@x.com", &code)
            .await
            .unwrap();

        assert!(cache
            .get("validEmail:a@x.com")
            .await
            .unwrap()
            .is_some());
        assert!(codes
            .consume_verified(CodePurpose::EmailVerification, "a@x.com")
            .await
            .unwrap());
        assert!(!codes
            .consume_verified(CodePurpose::EmailVerification, "a@x.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_code_discarded_after_max_misses() {
        let (_, codes) = codes_with_ttl(300);
        let code = codes.issue(CodePurpose::EmailVerification, "a@x.com").await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 0..5 {
            assert!(matches!(
                codes
                    .validate(CodePurpose::EmailVerification, "a@x.com", wrong)
                    .await,
                Err(AuthError::InvalidCode)
            ));
        }

        assert!(matches!(
            codes
                .validate(CodePurpose::EmailVerification, "a@x.com", &code)
                .await,
            Err(AuthError::InvalidCode)
        ));
    }

    #[tokio::test]
    async fn test_new_code_resets_misses() {
        let (_, codes) = codes_with_ttl(300);
        let first = codes.issue(CodePurpose::PasswordReset, "a@x.com").await.unwrap();
        let wrong = if first == "000000" { "000001" } else { "000000" };
        for _ in 0..4 {
            let _ = codes.validate(CodePurpose::PasswordReset, "a@x.com", wrong).await;
        }

        let code = codes.issue(CodePurpose::PasswordReset, "a@x.com").await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };
        let _ = codes.validate(CodePurpose::PasswordReset, "a@x.com", wrong).await;

        assert!(codes
            .validate(CodePurpose::PasswordReset, "a@x.com", &code)
            .await
            .is_ok());
    }
}
