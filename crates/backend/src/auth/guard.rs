//! Request guard for protected routes.
//!
//! The guard checks the token cryptographically before touching the user
//! store, so forged tokens never reach a store lookup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use uuid::Uuid;

use crate::config::{Config, SESSION_COOKIE_NAME};
use crate::error::ApiError;
use crate::store::{bounded, User, UserStore};
use crate::AppState;

use super::token::TokenService;
use super::types::AuthenticatedUser;

#[derive(Clone)]
pub struct AuthGuard {
    tokens: TokenService,
    store: Arc<dyn UserStore>,
    store_timeout: Duration,
    cookie_name: String,
}

impl AuthGuard {
    pub fn new(
        tokens: TokenService,
        store: Arc<dyn UserStore>,
        store_timeout: Duration,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            store,
            store_timeout,
            cookie_name: cookie_name.into(),
        }
    }

    /// Resolve the request's session token to a stored user.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = extract_token(headers, &self.cookie_name)
            .ok_or_else(|| ApiError::unauthenticated("You are not logged in"))?;

        let subject = self.tokens.validate(&token).map_err(|e| {
            tracing::debug!("Rejected session token: {}", e);
            ApiError::from(e)
        })?;

        let not_found = || ApiError::forbidden("The user belonging to this token no longer exists");

        let user_id = Uuid::parse_str(&subject).map_err(|_| not_found())?;

        bounded(self.store_timeout, self.store.find_by_id(user_id))
            .await?
            .ok_or_else(not_found)
    }
}

/// Middleware function that requires authentication.
///
/// Use with `axum::middleware::from_fn_with_state`. On success the resolved
/// user is available to handlers as `Extension<AuthenticatedUser>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = state.guard.authenticate(request.headers()).await?;
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Bearer header first, then the session cookie. Empty values are ignored.
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    extract_token_from_header(headers).or_else(|| extract_token_from_cookie(headers, cookie_name))
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = value.to_str() else {
            continue;
        };

        for cookie_str in cookie_header.split(';') {
            if let Ok(cookie) = Cookie::parse(cookie_str.trim()) {
                if cookie.name() == cookie_name && !cookie.value().is_empty() {
                    return Some(cookie.value().to_string());
                }
            }
        }
    }

    None
}

/// Session cookie whose max-age matches the token lifetime.
pub fn build_auth_cookie(config: &Config, token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token.to_string()))
        .path("/")
        .domain(config.cookie_domain.clone())
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(cookie::time::Duration::minutes(config.token_expires_in))
        .build()
}

/// Expired, empty session cookie used by logout.
pub fn clear_auth_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .domain(config.cookie_domain.clone())
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(cookie::time::Duration::ZERO)
        .build()
}
