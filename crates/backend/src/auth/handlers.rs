//! Authentication HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Deserialize;
use shared_types::{
    LoginInitResponse, LoginResponse, LoginUserRequest, RegisterUserRequest, StatusResponse,
    UserEnvelope, UserResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::models::NewUser;
use crate::store::{bounded, normalize_email, UpsertKey};
use crate::AppState;

use super::guard::{build_auth_cookie, clear_auth_cookie};
use super::password::{hash_password, verify_against_dummy, verify_password};
use super::types::AuthenticatedUser;

pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse::with_message(
        "Authentication with Google OAuth2 and local accounts",
    ))
}

fn require_field(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

/// Register a local (password) account.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<UserEnvelope>)> {
    require_field(&payload.name, "name")?;
    require_field(&payload.email, "email")?;
    require_field(&payload.password, "password")?;

    let email = normalize_email(&payload.email);
    let password_hash = hash_password(&payload.password)?;

    let user = bounded(
        state.config.store_timeout(),
        state
            .store
            .create(NewUser::local(&payload.name, &email, password_hash)),
    )
    .await?;

    tracing::info!("Registered local account {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope::success(UserResponse::from(&user))),
    ))
}

/// Sign in with email and password.
///
/// "No such user" and "wrong password" produce the same error and cost the
/// same Argon2 work, so neither body nor latency reveals whether an email is
/// registered.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<LoginUserRequest>,
) -> ApiResult<Response> {
    let email = normalize_email(&payload.email);
    let found = bounded(state.config.store_timeout(), state.store.find_by_email(&email)).await?;

    let Some(user) = found else {
        verify_against_dummy(&payload.password);
        return Err(ApiError::InvalidCredentials);
    };

    if user.is_oauth_account() {
        return Err(ApiError::WrongProvider(user.provider));
    }

    if !verify_password(&payload.password, &user.password) {
        tracing::info!("Failed password login for account {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.id.to_string())?;
    let cookie = build_auth_cookie(&state.config, &token);

    tracing::info!("Successful password login for account {}", user.id);

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse {
            status: "success".to_string(),
            token,
        }),
    )
        .into_response())
}

/// Logout - clear the session cookie. The token itself stays valid until it
/// expires.
pub async fn log_out(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = clear_auth_cookie(&state.config);
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Json(StatusResponse::success()),
    )
}

/// Get current authenticated user info.
pub async fn get_me(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<UserEnvelope> {
    Json(UserEnvelope::success(UserResponse::from(&user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginUrlParams {
    pub redirect_to: Option<String>,
}

/// Start Google OAuth login flow.
///
/// Returns a URL that the frontend should redirect the user to.
pub async fn google_login_url(
    State(state): State<AppState>,
    Query(params): Query<LoginUrlParams>,
) -> Json<LoginInitResponse> {
    let redirect_path = sanitize_redirect_path(params.redirect_to.as_deref());
    Json(LoginInitResponse {
        auth_url: state.oauth.authorization_url(redirect_path),
    })
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Handle Google OAuth callback.
///
/// Exchanges the authorization code for tokens, fetches the profile, upserts
/// the local account, sets the session cookie and redirects to the frontend.
pub async fn google_oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<AuthCallbackParams>,
) -> ApiResult<Response> {
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingAuthorizationCode)?;
    let redirect_path = sanitize_redirect_path(params.state.as_deref());

    let credential = state.oauth.exchange_code(&code).await?;
    let profile = state.oauth.fetch_profile(&credential).await?;

    if !profile.verified_email {
        tracing::warn!("Rejected Google login with unverified email");
        return Err(ApiError::UnverifiedEmail);
    }

    let account = NewUser::google(
        &profile.name,
        &normalize_email(&profile.email),
        &profile.picture,
    );
    let user = bounded(
        state.config.store_timeout(),
        state.store.upsert(account, UpsertKey::Email),
    )
    .await?;

    let token = state.tokens.issue(&user.id.to_string())?;
    let cookie = build_auth_cookie(&state.config, &token);

    tracing::info!("Successful Google login for account {}", user.id);

    let location = format!(
        "{}{}",
        state.config.frontend_origin.trim_end_matches('/'),
        redirect_path
    );

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::temporary(&location),
    )
        .into_response())
}

/// Only local absolute paths made of printable ASCII are honoured; anything
/// else becomes `/`. The result ends up in a `Location` header.
fn sanitize_redirect_path(state: Option<&str>) -> &str {
    match state {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && path.bytes().all(|b| b.is_ascii_graphic()) =>
        {
            path
        }
        _ => "/",
    }
}
