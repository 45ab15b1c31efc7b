use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{normalize_email, NewUser, StoreError, UpsertKey, User, UserStore};

/// Process-local store used by tests and `IN_MEMORY_STORE=true`.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user, e.g. to simulate an account deleted after login.
    #[cfg(test)]
    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }

    fn build(user: NewUser, email: String) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: user.name,
            email,
            password: user.password,
            role: user.role,
            photo: user.photo,
            verified: user.verified,
            provider: user.provider,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict);
        }

        let created = Self::build(user, email);
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn upsert(&self, user: NewUser, key: UpsertKey) -> Result<User, StoreError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;

        let existing = match key {
            UpsertKey::Email => users.values_mut().find(|u| u.email == email),
        };

        if let Some(existing) = existing {
            existing.name = user.name;
            existing.photo = user.photo;
            existing.verified = user.verified;
            existing.provider = user.provider;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let created = Self::build(user, email);
        users.insert(created.id, created.clone());
        Ok(created)
    }
}
