//! Auth-related types.

use serde::{Deserialize, Serialize};

use crate::store::User;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (local user id)
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Credentials returned by the provider's token endpoint.
///
/// Lives only for the duration of one sign-in exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredential {
    pub access_token: String,
    pub id_token: String,
}

impl std::fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("access_token", &"<redacted>")
            .field("id_token", &"<redacted>")
            .finish()
    }
}

/// Profile returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub id: String,
    pub email: String,
    pub verified_email: bool,
    pub name: String,
    pub picture: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub locale: Option<String>,
}

/// User resolved by the auth guard, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);
