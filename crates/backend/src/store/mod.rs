//! User persistence behind the `UserStore` trait.
//!
//! Every operation normalises the email it is given, so callers can pass
//! addresses in any case.

mod memory;
mod postgres;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use crate::models::{NewUser, User};
pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with the same email already exists.
    #[error("user already exists")]
    Conflict,

    #[error("user store did not respond in time")]
    Timeout,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Natural key an upsert matches existing users on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKey {
    /// The normalised email address.
    Email,
}

/// Run a store operation with an upper bound on how long it may take.
pub async fn bounded<T, F>(limit: Duration, op: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| StoreError::Timeout)?
}

/// Lower-case and trim an email address for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Atomically create the user or refresh the profile fields of the
    /// existing user matched by `key`. Password and role are kept.
    async fn upsert(&self, user: NewUser, key: UpsertKey) -> Result<User, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@Example.COM "), "a@example.com");
    }

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }
}
