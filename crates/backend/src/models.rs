// Database models for Diesel
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared_types::UserResponse;
use uuid::Uuid;

pub const PROVIDER_LOCAL: &str = "local";
pub const PROVIDER_GOOGLE: &str = "Google";
pub const DEFAULT_ROLE: &str = "user";
pub const DEFAULT_PHOTO: &str = "default.png";

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; empty for accounts created through OAuth.
    pub password: String,
    pub role: String,
    pub photo: String,
    pub verified: bool,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_oauth_account(&self) -> bool {
        self.provider != PROVIDER_LOCAL
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            provider: user.provider.clone(),
            photo: user.photo.clone(),
            verified: user.verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Insertable struct for new users
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub photo: String,
    pub verified: bool,
    pub provider: String,
}

impl NewUser {
    /// A password account awaiting verification.
    pub fn local(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.to_string(),
            password: password_hash,
            role: DEFAULT_ROLE.to_string(),
            photo: DEFAULT_PHOTO.to_string(),
            verified: false,
            provider: PROVIDER_LOCAL.to_string(),
        }
    }

    /// An account sourced from a verified Google profile.
    pub fn google(name: &str, email: &str, photo: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: String::new(),
            role: DEFAULT_ROLE.to_string(),
            photo: if photo.is_empty() {
                DEFAULT_PHOTO.to_string()
            } else {
                photo.to_string()
            },
            verified: true,
            provider: PROVIDER_GOOGLE.to_string(),
        }
    }
}
