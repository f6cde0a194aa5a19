//! Authentication Middleware
//!
//! Bearer token validation against the service's injected signing key.

use crate::error::AuthError;
use crate::extractors::{bearer_token, AuthUser};
use crate::handlers::AuthState;
use crate::models::Role;
use crate::service::AuthService;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::pin::Pin;

fn caller(auth: &AuthService, req: &Request) -> Result<AuthUser, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    auth.authenticate(bearer_token(header)?)
}

/// Require authenticated user
///
/// Validates the access token from the Authorization header and stores the
/// caller in request extensions for the [`crate::AuthUser`] extractor.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = caller(&auth, &req)?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Require admin role
pub async fn require_admin(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = caller(&auth, &req)?;

    if !user.is_admin() {
        tracing::debug!(account_id = %user.id, "Admin route refused");
        return Err(AuthError::Forbidden);
    }

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

type Gate = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Require one of `roles`
///
/// For routes outside this crate, e.g. areas open only to `AUTH_USER` and
/// `ADMIN`. Use with [`axum::middleware::from_fn`]:
///
/// ```rust,ignore
/// router.layer(from_fn(require_role(auth, &[Role::AuthUser, Role::Admin])))
/// ```
pub fn require_role(
    auth: AuthState,
    roles: &'static [Role],
) -> impl Fn(Request, Next) -> Gate + Clone + Send + Sync + 'static {
    move |mut req: Request, next: Next| -> Gate {
        let auth = auth.clone();
        Box::pin(async move {
            let user = caller(&auth, &req)?;

            if !roles.contains(&user.role) {
                tracing::debug!(account_id = %user.id, role = %user.role, "Role gate refused");
                return Err(AuthError::Forbidden);
            }

            req.extensions_mut().insert(user);

            Ok(next.run(req).await)
        })
    }
}
