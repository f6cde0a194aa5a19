//! JWT access and refresh token issuance
//!
//! Both tokens are HS256 JWTs signed with the configured secret. Access
//! tokens carry everything needed to rebuild the caller identity without a
//! store lookup; refresh tokens carry only id and role and are additionally
//! recorded server-side by [`crate::sessions::SessionStore`].

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// Signs and verifies credential tokens
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_expiration: i64,
    refresh_token_expiration: i64,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_token_expiration: config.access_token_expiration,
            refresh_token_expiration: config.refresh_token_expiration,
        }
    }

    /// Issue a fresh access/refresh pair for an account
    pub fn issue(&self, account: &Account) -> Result<CredentialPair, AuthError> {
        Ok(CredentialPair {
            access_token: self.generate_access_token(account)?,
            refresh_token: self.generate_refresh_token(account)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiration,
        })
    }

    /// Generate an access token for an account
    pub fn generate_access_token(&self, account: &Account) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiration);

        let claims = AccessTokenClaims {
            sub: account.id,
            email: account.email.clone(),
            nickname: account.nickname.clone(),
            role: account.role,
            typ: TokenKind::Access,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Generate a refresh token for an account
    pub fn generate_refresh_token(&self, account: &Account) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.refresh_token_expiration);

        let claims = RefreshTokenClaims {
            sub: account.id,
            role: account.role,
            typ: TokenKind::Refresh,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Validate an access token
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation())?
            .claims;

        if claims.typ != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Validate a refresh token's signature, expiry and kind
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, AuthError> {
        let claims = decode::<RefreshTokenClaims>(token, &self.decoding_key, &self.validation())?
            .claims;

        if claims.typ != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new("a".repeat(32)))
    }

    fn account() -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            nickname: "nickA".into(),
            password_hash: String::new(),
            role: Role::AuthUser,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let account = account();

        let pair = issuer.issue(&account).unwrap();
        let claims = issuer.validate_access_token(&pair.access_token).unwrap();

        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, Role::AuthUser);
        assert_eq!(claims.nickname, "nickA");
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let issuer = issuer();
        let account = account();

        let first = issuer.generate_refresh_token(&account).unwrap();
        let second = issuer.generate_refresh_token(&account).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue(&account()).unwrap();

        assert!(matches!(
            issuer.validate_refresh_token(&pair.access_token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.validate_access_token(&pair.refresh_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenIssuer::new(&AuthConfig::new("b".repeat(32)));
        let token = other.generate_refresh_token(&account()).unwrap();

        assert!(matches!(
            issuer().validate_refresh_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let issuer = issuer();
        let account = account();
        let past = Utc::now() - Duration::seconds(10);

        let claims = RefreshTokenClaims {
            sub: account.id,
            role: account.role,
            typ: TokenKind::Refresh,
            iat: (past - Duration::seconds(60)).timestamp(),
            exp: past.timestamp(),
            iss: "blur".into(),
            aud: "blur-api".into(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &issuer.encoding_key).unwrap();

        assert!(matches!(
            issuer.validate_refresh_token(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let mut config = AuthConfig::new("a".repeat(32));
        config.jwt_audience = "someone-else".into();
        let token = TokenIssuer::new(&config)
            .generate_access_token(&account())
            .unwrap();

        assert!(issuer().validate_access_token(&token).is_err());
    }
}
