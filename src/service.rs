//! Authentication Service
//!
//! Orchestrates signup, login, token reissue, nickname checks and the
//! email / password-reset code flows on top of the account store, the TTL
//! cache, the token issuer and the mailer.

use crate::cache::TtlCache;
use crate::codes::{CodePurpose, VerificationCodes};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::extractors::AuthUser;
use crate::mail::Mailer;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::sessions::SessionStore;
use crate::store::AccountRepository;
use crate::tokens::TokenIssuer;

use std::sync::Arc;
use uuid::Uuid;

/// Authentication service
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
    passwords: PasswordHasher,
    tokens: TokenIssuer,
    sessions: SessionStore,
    codes: VerificationCodes,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        config: AuthConfig,
        accounts: Arc<dyn AccountRepository>,
        cache: Arc<dyn TtlCache>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        Ok(Self {
            passwords: PasswordHasher::new(&config)?,
            tokens: TokenIssuer::new(&config),
            sessions: SessionStore::new(
                cache.clone(),
                &config.jwt_secret,
                config.refresh_token_expiration,
            ),
            codes: VerificationCodes::new(cache, &config),
            accounts,
            mailer,
            config,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ============================================
    // Signup
    // ============================================

    /// Register a new member with the basic role
    pub async fn create_account(&self, req: SignupRequest) -> Result<bool, AuthError> {
        validate_request(&req)?;

        if self.accounts.find_by_email(&req.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.accounts.find_by_nickname(&req.nickname).await?.is_some() {
            return Err(AuthError::DuplicateNickname);
        }

        // Spending the marker up front makes it single use under concurrency.
        if self.config.require_email_verification
            && !self
                .codes
                .consume_verified(CodePurpose::EmailVerification, &req.email)
                .await?
        {
            return Err(AuthError::EmailNotVerified);
        }

        let password_hash = self.passwords.hash(&req.password).await?;

        // The store re-checks uniqueness; a racing signup surfaces here.
        let account = self
            .accounts
            .create(NewAccount {
                email: req.email,
                nickname: req.nickname,
                password_hash,
                role: Role::BasicUser,
            })
            .await?;

        tracing::info!(account_id = %account.id, "Account created");
        Ok(true)
    }

    /// Whether `nickname` is still free
    pub async fn check_nickname_availability(&self, nickname: &str) -> Result<bool, AuthError> {
        Ok(self.accounts.find_by_nickname(nickname).await?.is_none())
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify credentials and open a session
    pub async fn login(&self, req: SignInRequest) -> Result<CredentialPair, AuthError> {
        validate_request(&req)?;

        let Some(account) = self.accounts.find_by_email(&req.email).await? else {
            self.passwords.verify_dummy(&req.password).await;
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .passwords
            .verify(&req.password, &account.password_hash)
            .await?
        {
            tracing::debug!(account_id = %account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_active() {
            return Err(AuthError::AccountNotActive);
        }

        let pair = self.open_session(&account).await?;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(pair)
    }

    /// Revoke the account's refresh token
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AuthError> {
        if self.sessions.revoke(account_id).await? {
            tracing::info!(account_id = %account_id, "Session closed");
        }
        Ok(())
    }

    // ============================================
    // Token Reissue
    // ============================================

    /// Exchange a refresh token for a new pair (rotation)
    pub async fn reissue_token(&self, req: ReissueRequest) -> Result<CredentialPair, AuthError> {
        validate_request(&req)?;

        let claims = self.tokens.validate_refresh_token(&req.refresh_token)?;

        if !self.sessions.matches(claims.sub, &req.refresh_token).await? {
            tracing::warn!(
                account_id = %claims.sub,
                "Refresh token does not match the session on record"
            );
            return Err(AuthError::TokenMismatch);
        }

        let account = self
            .accounts
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !account.is_active() {
            self.sessions.revoke(account.id).await?;
            return Err(AuthError::InvalidToken);
        }

        // Concurrent reissues race here; the last write wins.
        let pair = self.open_session(&account).await?;

        tracing::debug!(account_id = %account.id, "Tokens reissued");
        Ok(pair)
    }

    async fn open_session(&self, account: &Account) -> Result<CredentialPair, AuthError> {
        let pair = self.tokens.issue(account)?;
        self.sessions.store(account.id, &pair.refresh_token).await?;
        Ok(pair)
    }

    /// Resolve the caller behind an access token
    pub fn authenticate(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.tokens.validate_access_token(access_token)?;
        Ok(AuthUser::from_claims(&claims))
    }

    // ============================================
    // Email Verification
    // ============================================

    /// Send a signup verification code to `email`
    pub async fn create_email_auth_code(&self, email: &str) -> Result<bool, AuthError> {
        validate_request(&EmailAddress {
            email: email.to_string(),
        })?;

        let code = self.codes.issue(CodePurpose::EmailVerification, email).await?;
        self.deliver(email, CodePurpose::EmailVerification, &code).await;

        Ok(true)
    }

    /// Check a signup verification code
    pub async fn validate_email_auth_code(&self, req: EmailAuthRequest) -> Result<bool, AuthError> {
        validate_request(&req)?;

        self.codes
            .validate(CodePurpose::EmailVerification, &req.email, &req.code)
            .await?;

        Ok(true)
    }

    // ============================================
    // Password Reset
    // ============================================

    /// Send a password-reset code to `email` if it belongs to an account.
    ///
    /// Answers `true` for unknown addresses too, without sending anything.
    pub async fn create_password_auth_code(&self, email: &str) -> Result<bool, AuthError> {
        validate_request(&EmailAddress {
            email: email.to_string(),
        })?;

        if self.accounts.find_by_email(email).await?.is_none() {
            tracing::debug!("Password code requested for unknown email");
            return Ok(true);
        }

        let code = self.codes.issue(CodePurpose::PasswordReset, email).await?;
        self.deliver(email, CodePurpose::PasswordReset, &code).await;

        Ok(true)
    }

    /// Check a password-reset code
    pub async fn validate_password_auth_code(
        &self,
        req: EmailAuthRequest,
    ) -> Result<bool, AuthError> {
        validate_request(&req)?;

        self.codes
            .validate(CodePurpose::PasswordReset, &req.email, &req.code)
            .await?;

        Ok(true)
    }

    /// Set a new password after the password-reset code was accepted
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<bool, AuthError> {
        validate_request(&req)?;

        // Only the caller that removes the marker may reset.
        if !self
            .codes
            .consume_verified(CodePurpose::PasswordReset, &req.email)
            .await?
        {
            return Err(AuthError::PasswordChangeNotVerified);
        }

        let account = self
            .accounts
            .find_by_email(&req.email)
            .await?
            .ok_or(AuthError::PasswordChangeNotVerified)?;

        let password_hash = self.passwords.hash(&req.password).await?;
        self.accounts
            .update_password(account.id, &password_hash)
            .await?;
        self.sessions.revoke(account.id).await?;

        tracing::info!(account_id = %account.id, "Password reset");
        Ok(true)
    }

    async fn deliver(&self, email: &str, purpose: CodePurpose, code: &str) {
        if let Err(e) = self.mailer.send(email, purpose, code).await {
            tracing::warn!(email, ?purpose, error = %e, "Failed to deliver verification code");
        }
    }

    // ============================================
    // Account Management
    // ============================================

    /// Get account by ID
    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, AuthError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Change an account's role. Outstanding access tokens keep the old
    /// role until they expire; the refresh token is revoked so the next
    /// login picks up the new one.
    pub async fn change_role(&self, account_id: Uuid, role: Role) -> Result<Account, AuthError> {
        let account = self.accounts.update_role(account_id, role).await?;
        self.sessions.revoke(account_id).await?;

        tracing::info!(account_id = %account_id, role = %role, "Role changed");
        Ok(account)
    }
}
