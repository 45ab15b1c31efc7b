use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use diesel_async::{pooled_connection::deadpool::Object, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use super::{bounded, normalize_email, NewUser, StoreError, UpsertKey, User, UserStore};
use crate::db::{get_conn, DbPool};

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: DbPool,
    acquire_timeout: Duration,
}

impl PgUserStore {
    /// `acquire_timeout` bounds the wait for a pooled connection.
    pub fn new(pool: DbPool, acquire_timeout: Duration) -> Self {
        Self {
            pool,
            acquire_timeout,
        }
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, StoreError> {
        bounded(self.acquire_timeout, async {
            Ok(get_conn(&self.pool).await?)
        })
        .await
    }
}

fn backend(err: DieselError) -> StoreError {
    StoreError::Backend(err.into())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email_addr: &str) -> Result<Option<User>, StoreError> {
        use crate::schema::users::dsl::*;

        let mut conn = self.conn().await?;
        users
            .filter(email.eq(normalize_email(email_addr)))
            .select(User::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(backend)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        use crate::schema::users::dsl::*;

        let mut conn = self.conn().await?;
        users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first(&mut *conn)
            .await
            .optional()
            .map_err(backend)
    }

    async fn create(&self, mut user: NewUser) -> Result<User, StoreError> {
        use crate::schema::users::dsl::*;

        user.email = normalize_email(&user.email);
        let mut conn = self.conn().await?;

        diesel::insert_into(users)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::Conflict
                }
                other => backend(other),
            })
    }

    async fn upsert(&self, mut user: NewUser, key: UpsertKey) -> Result<User, StoreError> {
        use crate::schema::users::dsl::*;

        user.email = normalize_email(&user.email);
        let mut conn = self.conn().await?;

        let target = match key {
            UpsertKey::Email => email,
        };

        // single statement, so concurrent logins for one email cannot race
        diesel::insert_into(users)
            .values(&user)
            .on_conflict(target)
            .do_update()
            .set((
                name.eq(excluded(name)),
                photo.eq(excluded(photo)),
                verified.eq(excluded(verified)),
                provider.eq(excluded(provider)),
                updated_at.eq(diesel::dsl::now),
            ))
            .returning(User::as_returning())
            .get_result(&mut *conn)
            .await
            .map_err(backend)
    }
}
