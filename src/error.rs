//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A single rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    /// Rejected input, when it is safe to echo back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Nickname already in use")]
    DuplicateNickname,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code has expired")]
    CodeExpired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Refresh token does not match the active session")]
    TokenMismatch,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Password change has not been verified")]
    PasswordChangeNotVerified,

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::DuplicateNickname => (StatusCode::CONFLICT, "duplicate_nickname"),
            AuthError::DuplicateEmail => (StatusCode::CONFLICT, "duplicate_email"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InvalidCode => (StatusCode::BAD_REQUEST, "invalid_code"),
            AuthError::CodeExpired => (StatusCode::BAD_REQUEST, "code_expired"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::TokenMismatch => (StatusCode::UNAUTHORIZED, "token_mismatch"),
            AuthError::EmailNotVerified => (StatusCode::FORBIDDEN, "email_not_verified"),
            AuthError::PasswordChangeNotVerified => {
                (StatusCode::FORBIDDEN, "password_change_not_verified")
            }
            AuthError::AccountNotActive => (StatusCode::FORBIDDEN, "account_not_active"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "account_not_found"),
            AuthError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AuthError::Database(_) | AuthError::Cache(_) | AuthError::Mail(_) | AuthError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = match self {
            AuthError::Validation(fields) => serde_json::json!({
                "error": error_code,
                "message": message,
                "fields": fields
            }),
            _ => serde_json::json!({
                "error": error_code,
                "message": message
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| FieldError {
                    field: field.clone(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string()),
                    input: err
                        .params
                        .get("value")
                        .filter(|_| field != "password")
                        .and_then(|v| v.as_str())
                        .map(String::from),
                })
            })
            .collect();

        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AuthError::Validation(fields)
    }
}

/// Body that is not JSON, or does not fit the request type, is reported like
/// any other invalid field.
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        let field = match &rejection {
            JsonRejection::JsonDataError(_) => rejected_field(&message),
            _ => None,
        }
        .unwrap_or_else(|| "body".to_string());

        AuthError::Validation(vec![FieldError {
            field,
            message,
            input: None,
        }])
    }
}

/// Field named by a deserialization error, e.g. ``missing field `nickname` ``
/// or ``role: unknown variant ...``.
fn rejected_field(message: &str) -> Option<String> {
    let reason = message
        .split_once("target type: ")
        .map_or(message, |(_, reason)| reason);

    if let Some(rest) = reason.strip_prefix("missing field `") {
        return rest.split('`').next().map(String::from);
    }

    let (path, _) = reason.split_once(": ")?;
    (!path.is_empty() && !path.contains(char::is_whitespace)).then(|| path.to_string())
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AuthError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!("Cache error: {:?}", err);
        AuthError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("Cache record encoding error: {:?}", err);
        AuthError::Cache(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        AuthError::InvalidToken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_opaque() {
        let response = AuthError::Database("connection refused on 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::DuplicateEmail.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::TokenMismatch.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::CodeExpired.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Validation(Vec::new()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_rejected_field() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: \
                 missing field `nickname` at line 1 column 36"
            )
            .as_deref(),
            Some("nickname")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: \
                 role: unknown variant `ROOT` at line 1 column 14"
            )
            .as_deref(),
            Some("role")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: \
                 invalid type: integer `5`, expected a map at line 1 column 1"
            ),
            None
        );
    }

    #[test]
    fn test_validation_display_counts_fields() {
        let err = AuthError::Validation(vec![
            FieldError {
                field: "email".into(),
                message: "Invalid email format".into(),
                input: Some("nope".into()),
            },
            FieldError {
                field: "nickname".into(),
                message: "Nickname must be 2-20 characters".into(),
                input: None,
            },
        ]);
        assert_eq!(err.to_string(), "Validation failed for 2 field(s)");
    }
}
