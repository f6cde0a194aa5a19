//! Authentication HTTP Handlers
//!
//! REST API endpoints for authentication operations.

use crate::error::AuthError;
use crate::extractors::{AuthUser, ClientInfo, JsonBody};
use crate::middleware;
use crate::models::*;
use crate::service::AuthService;

use axum::{
    extract::{Path, State},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create authentication routes
pub fn create_routes(auth_service: AuthState) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/v1/auth/signup", post(signup))
        .route("/v1/auth/signin", post(signin))
        .route("/v1/auth/reissue", post(reissue))
        .route("/v1/auth/check/nickname/:nickname", get(check_nickname))
        .route("/v1/auth/email/:email", get(create_email_auth_code))
        .route("/v1/auth/email", post(validate_email_auth_code))
        .route(
            "/v1/auth/password/email/:email",
            get(create_password_auth_code),
        )
        .route("/v1/auth/password/email", post(validate_password_auth_code))
        .route("/v1/auth/password/reset", post(reset_password));

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/v1/auth/me", get(current_user))
        .route("/v1/auth/logout", post(logout))
        .layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_auth,
        ));

    let admin = Router::new()
        .route("/v1/auth/members/:id/role", put(change_role))
        .layer(axum_middleware::from_fn_with_state(
            auth_service.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .with_state(auth_service)
}

// ============================================
// Signup
// ============================================

/// POST /v1/auth/signup
pub async fn signup(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.create_account(req).await?))
}

/// GET /v1/auth/check/nickname/:nickname
///
/// `true` when the nickname is still available
pub async fn check_nickname(
    State(auth): State<AuthState>,
    Path(nickname): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.check_nickname_availability(&nickname).await?))
}

// ============================================
// Sign-in / Tokens
// ============================================

/// POST /v1/auth/signin
pub async fn signin(
    State(auth): State<AuthState>,
    ClientInfo { ip, user_agent }: ClientInfo,
    JsonBody(req): JsonBody<SignInRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let result = auth.login(req).await;

    if let Err(AuthError::InvalidCredentials) = &result {
        tracing::info!(ip = ?ip, user_agent = ?user_agent, "Sign-in failed");
    }

    Ok(Json(result?))
}

/// POST /v1/auth/reissue
pub async fn reissue(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<ReissueRequest>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.reissue_token(req).await?))
}

/// POST /v1/auth/logout
pub async fn logout(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    auth.logout(user.id).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// GET /v1/auth/me
pub async fn current_user(
    State(auth): State<AuthState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let account = auth.get_account(user.id).await?;
    Ok(Json(AccountResponse::from(account)))
}

// ============================================
// Email Verification
// ============================================

/// GET /v1/auth/email/:email
pub async fn create_email_auth_code(
    State(auth): State<AuthState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.create_email_auth_code(&email).await?))
}

/// POST /v1/auth/email
pub async fn validate_email_auth_code(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<EmailAuthRequest>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.validate_email_auth_code(req).await?))
}

// ============================================
// Password Reset
// ============================================

/// GET /v1/auth/password/email/:email
pub async fn create_password_auth_code(
    State(auth): State<AuthState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.create_password_auth_code(&email).await?))
}

/// POST /v1/auth/password/email
pub async fn validate_password_auth_code(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<EmailAuthRequest>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.validate_password_auth_code(req).await?))
}

/// POST /v1/auth/password/reset
pub async fn reset_password(
    State(auth): State<AuthState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.reset_password(req).await?))
}

// ============================================
// Administration
// ============================================

/// PUT /v1/auth/members/:id/role
pub async fn change_role(
    State(auth): State<AuthState>,
    admin: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let account = auth.change_role(id, req.role).await?;

    tracing::info!(admin_id = %admin.id, account_id = %id, "Role updated by admin");
    Ok(Json(AccountResponse::from(account)))
}
