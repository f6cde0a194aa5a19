//! Authentication Models
//!
//! Data structures for authentication requests, responses, and stored records.

use crate::error::AuthError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ============================================
// Stored Records
// ============================================

/// Member role enum matching database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Signed up, vehicle not verified
    BasicUser,
    /// Signed up with a verified vehicle
    AuthUser,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::BasicUser => "BASIC_USER",
            Role::AuthUser => "AUTH_USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account status enum matching database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Withdrawn,
}

/// Member account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Fields required to insert a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: Role,
}

// ============================================
// Request DTOs
// ============================================

/// Signup request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,

    #[validate(length(min = 4, max = 64, message = "Password must be 4-64 characters"))]
    pub password: String,
}

/// Sign-in request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token reissue request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReissueRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Email (or password-reset) code validation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailAuthRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

/// Target address for a new code
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailAddress {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset request (after the password code was validated)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 4, max = 64, message = "Password must be 4-64 characters"))]
    pub password: String,
}

/// Role change request
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Run the field constraints of a request DTO before any side effect.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AuthError> {
    req.validate().map_err(AuthError::from)
}

fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let len = nickname.chars().count();
    if !(2..=20).contains(&len) {
        let mut err = ValidationError::new("length");
        err.message = Some("Nickname must be 2-20 characters".into());
        return Err(err);
    }
    if nickname.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("whitespace");
        err.message = Some("Nickname must not contain whitespace".into());
        return Err(err);
    }
    Ok(())
}

// ============================================
// Response DTOs
// ============================================

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Public account data without sensitive fields
#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            nickname: account.nickname,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================
// JWT Claims
// ============================================

/// Discriminates access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub email: String,
    pub nickname: String,
    pub role: Role,
    pub typ: TokenKind,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// JWT claims for refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub role: Role,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str, nickname: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.into(),
            nickname: nickname.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_signup_validation() {
        assert!(signup("a@x.com", "nickA", "pw123").validate().is_ok());
        assert!(signup("not-an-email", "nickA", "pw123").validate().is_err());
        assert!(signup("a@x.com", "n", "pw123").validate().is_err());
        assert!(signup("a@x.com", "nick A", "pw123").validate().is_err());
        assert!(signup("a@x.com", "nickA", "pw").validate().is_err());
    }

    #[test]
    fn test_validate_request_reports_fields() {
        let err = validate_request(&signup("nope", "n", "pw123")).unwrap_err();
        match err {
            AuthError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["email", "nickname"]);
                assert_eq!(fields[0].input.as_deref(), Some("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nickname_length_counts_characters() {
        assert!(validate_nickname("블러").is_ok());
        assert!(validate_nickname(&"가".repeat(21)).is_err());
    }

    #[test]
    fn test_role_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::BasicUser).unwrap(),
            "\"BASIC_USER\""
        );
        let role: Role = serde_json::from_str("\"AUTH_USER\"").unwrap();
        assert_eq!(role, Role::AuthUser);
        assert_eq!(Role::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_account_response_hides_password_hash() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            nickname: "nickA".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::BasicUser,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
