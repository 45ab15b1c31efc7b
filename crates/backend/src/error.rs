//! Unified error handling for the auth API.
//!
//! Every failure surfaced to a client carries a stable `kind` and a
//! human-readable message. Lower layers keep their own narrower error enums
//! (`TokenError`, `OAuthError`, `StoreError`) and convert into `ApiError`
//! at the handler boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::oauth::OAuthError;
use crate::auth::token::TokenError;
use crate::store::StoreError;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub kind: &'static str,
    pub message: String,
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authorization code not provided")]
    MissingAuthorizationCode,

    #[error("Could not exchange authorization code: {0}")]
    CodeExchangeFailed(String),

    #[error("Malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("Could not retrieve user profile: {0}")]
    ProfileFetchFailed(String),

    #[error("Malformed profile response: {0}")]
    MalformedProfileResponse(String),

    /// No usable token was presented, or it failed validation.
    #[error("{0}")]
    Unauthenticated(String),

    /// Token is valid but its subject no longer resolves to a user.
    #[error("{0}")]
    Forbidden(String),

    #[error("Failed to sign token")]
    SigningError,

    #[error("User email already exists")]
    DuplicateEmail,

    #[error("Invalid Email or Password")]
    InvalidCredentials,

    #[error("Use {0} OAuth instead")]
    WrongProvider(String),

    #[error("Provider email address is not verified")]
    UnverifiedEmail,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("User store error")]
    Store(#[source] StoreError),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingAuthorizationCode => "missing_authorization_code",
            ApiError::CodeExchangeFailed(_) => "code_exchange_failed",
            ApiError::MalformedTokenResponse(_) => "malformed_token_response",
            ApiError::ProfileFetchFailed(_) => "profile_fetch_failed",
            ApiError::MalformedProfileResponse(_) => "malformed_profile_response",
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::SigningError => "signing_error",
            ApiError::DuplicateEmail => "duplicate_email",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::WrongProvider(_) => "wrong_provider",
            ApiError::UnverifiedEmail => "unverified_email",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Store(_) => "store_error",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingAuthorizationCode
            | ApiError::Unauthenticated(_)
            | ApiError::WrongProvider(_) => StatusCode::UNAUTHORIZED,
            ApiError::CodeExchangeFailed(_)
            | ApiError::MalformedTokenResponse(_)
            | ApiError::ProfileFetchFailed(_)
            | ApiError::MalformedProfileResponse(_) => StatusCode::BAD_GATEWAY,
            ApiError::Forbidden(_) | ApiError::UnverifiedEmail => StatusCode::FORBIDDEN,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SigningError | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature | TokenError::Malformed(_) => {
                ApiError::unauthenticated("Invalid token")
            }
            TokenError::Expired => ApiError::unauthenticated("Token has expired"),
            TokenError::Signing(_) => ApiError::SigningError,
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::MissingAuthorizationCode => ApiError::MissingAuthorizationCode,
            OAuthError::CodeExchangeFailed(msg) => ApiError::CodeExchangeFailed(msg),
            OAuthError::MalformedTokenResponse(msg) => ApiError::MalformedTokenResponse(msg),
            OAuthError::ProfileFetchFailed(msg) => ApiError::ProfileFetchFailed(msg),
            OAuthError::MalformedProfileResponse(msg) => ApiError::MalformedProfileResponse(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => ApiError::DuplicateEmail,
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!("User store error: {:?}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
            ApiError::SigningError => {
                tracing::error!("Token signing failed");
                self.to_string()
            }
            ApiError::CodeExchangeFailed(_)
            | ApiError::MalformedTokenResponse(_)
            | ApiError::ProfileFetchFailed(_)
            | ApiError::MalformedProfileResponse(_) => {
                tracing::warn!("Identity provider error: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            status: if status.is_server_error() { "error" } else { "fail" },
            kind: self.kind(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthenticated_body() {
        let (status, body) = body_json(ApiError::unauthenticated("You are not logged in")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "fail");
        assert_eq!(body["kind"], "unauthenticated");
        assert_eq!(body["message"], "You are not logged in");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) =
            body_json(ApiError::Internal(anyhow::anyhow!("db password is hunter2"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::MissingAuthorizationCode.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::CodeExchangeFailed("502".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ApiError::forbidden("gone").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Invalid Email or Password"
        );
    }

    #[test]
    fn test_store_conflict_maps_to_duplicate_email() {
        let err: ApiError = StoreError::Conflict.into();
        assert_eq!(err.kind(), "duplicate_email");
    }

    #[test]
    fn test_token_validation_errors_are_unauthenticated() {
        let expired = ApiError::from(TokenError::Expired);
        assert_eq!(expired.kind(), "unauthenticated");
        assert_eq!(expired.to_string(), "Token has expired");

        let forged = ApiError::from(TokenError::InvalidSignature);
        assert_eq!(forged.kind(), "unauthenticated");
        assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);

        let garbage = ApiError::from(TokenError::Malformed("bad base64".into()));
        assert_eq!(garbage.to_string(), "Invalid token");
    }

    #[test]
    fn test_signing_error_is_server_error() {
        let err = ApiError::from(TokenError::Signing("empty secret".into()));
        assert_eq!(err.kind(), "signing_error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_timeout_is_server_error() {
        let err = ApiError::from(StoreError::Timeout);
        assert_eq!(err.kind(), "store_error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
