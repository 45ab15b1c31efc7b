//! Signed, expiring session tokens (HS256 JWTs).
//!
//! Tokens are stateless: nothing is stored server-side, so a token stays
//! valid until its `exp` passes. Logout only discards the client copy.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;

use super::types::Claims;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issue a token for `subject` that expires `ttl` from now.
pub fn issue_token(subject: &str, ttl: Duration, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::Signing("signing secret is empty".to_string()));
    }

    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Validate a token and return its subject.
pub fn validate_token(token: &str, secret: &str) -> Result<String, TokenError> {
    decode_claims(token, secret).map(|claims| claims.sub)
}

/// Verify the signature, then check expiry with no leeway.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // exp is checked below so that `now >= exp` is rejected exactly
    validation.validate_exp = false;
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(e.to_string()),
    })?;

    if Utc::now().timestamp() >= data.claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(data.claims)
}

/// Token issuer/validator bound to one secret and lifetime.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        issue_token(subject, self.ttl, &self.secret)
    }

    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        validate_token(token, &self.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only";

    #[test]
    fn test_issue_and_validate_token() {
        let token = issue_token("user-123", Duration::minutes(15), SECRET).expect("should issue");
        assert_eq!(validate_token(&token, SECRET), Ok("user-123".to_string()));
    }

    #[test]
    fn test_claims_carry_iat_and_exp() {
        let token = issue_token("user-123", Duration::minutes(15), SECRET).unwrap();
        let claims = decode_claims(&token, SECRET).unwrap();
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token("user-123", Duration::minutes(15), SECRET).unwrap();
        assert_eq!(
            validate_token(&token, "wrong-secret"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_zero_expiry_rejected() {
        let token = issue_token("user-123", Duration::zero(), SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_elapsed_expiry_rejected() {
        let token = issue_token("user-123", Duration::minutes(-5), SECRET).unwrap();
        assert_eq!(validate_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_expired_token_with_bad_signature_reports_signature() {
        let token = issue_token("user-123", Duration::minutes(-5), SECRET).unwrap();
        assert_eq!(
            validate_token(&token, "other"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let victim = issue_token("user-123", Duration::minutes(15), SECRET).unwrap();
        let attacker = issue_token("admin", Duration::minutes(15), "attacker-secret").unwrap();

        // splice the attacker's payload under the victim's header and signature
        let v: Vec<&str> = victim.split('.').collect();
        let a: Vec<&str> = attacker.split('.').collect();
        let forged = format!("{}.{}.{}", v[0], a[1], v[2]);

        assert_eq!(
            validate_token(&forged, SECRET),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        assert!(matches!(
            validate_token("invalid-token", SECRET),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_secret_fails_signing() {
        assert!(matches!(
            issue_token("user-123", Duration::minutes(15), ""),
            Err(TokenError::Signing(_))
        ));
    }

    #[test]
    fn test_service_round_trip() {
        let service = TokenService::new(SECRET, Duration::minutes(60));
        let token = service.issue("abc").unwrap();
        assert_eq!(service.validate(&token).unwrap(), "abc");
    }
}
