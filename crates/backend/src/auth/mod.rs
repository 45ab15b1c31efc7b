//! Authentication with local passwords and Google OAuth login.
//!
//! This module provides:
//! - Session token issuance and validation (`token`)
//! - The Google authorization-code exchange (`oauth`)
//! - `AuthGuard` and the `require_auth` middleware for protecting routes
//! - Sign-up, sign-in, logout and OAuth callback handlers

mod guard;
pub mod handlers;
pub mod oauth;
mod password;
pub mod token;
pub mod types;

pub use guard::{require_auth, AuthGuard};
pub use oauth::{GoogleOAuthClient, OAuthSettings};
pub use token::TokenService;
