//! Server-side refresh token records
//!
//! One record per account under `refreshToken:{account_id}`. Only a keyed
//! HMAC-SHA256 digest of the token is stored; a presented token matches when
//! its digest verifies against the record (constant-time). Writing a new
//! record replaces the old one, which is what invalidates a rotated token.

use crate::cache::{Namespace, TtlCache};
use crate::config::seconds;
use crate::error::AuthError;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub struct SessionStore {
    cache: Arc<dyn TtlCache>,
    key: Vec<u8>,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn TtlCache>, secret: &str, ttl_secs: i64) -> Self {
        Self {
            cache,
            key: secret.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    fn mac(&self, token: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| AuthError::Internal)?;
        mac.update(token.as_bytes());
        Ok(mac)
    }

    /// Record `token` as the only valid refresh token of `account_id`.
    pub async fn store(&self, account_id: Uuid, token: &str) -> Result<(), AuthError> {
        let digest = hex::encode(self.mac(token)?.finalize().into_bytes());
        self.cache
            .put(
                &Namespace::RefreshToken.key(account_id),
                &digest,
                seconds(self.ttl_secs),
            )
            .await
    }

    /// Whether `token` is the refresh token on record for `account_id`.
    pub async fn matches(&self, account_id: Uuid, token: &str) -> Result<bool, AuthError> {
        let Some(stored) = self
            .cache
            .get(&Namespace::RefreshToken.key(account_id))
            .await?
        else {
            return Ok(false);
        };

        let Ok(stored) = hex::decode(stored) else {
            tracing::warn!(account_id = %account_id, "Malformed refresh token record");
            return Ok(false);
        };

        Ok(self.mac(token)?.verify_slice(&stored).is_ok())
    }

    /// Drop the record, invalidating any outstanding refresh token.
    pub async fn revoke(&self, account_id: Uuid) -> Result<bool, AuthError> {
        self.cache
            .delete(&Namespace::RefreshToken.key(account_id))
            .await
    }
}
