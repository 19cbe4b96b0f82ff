//! User accounts on top of the query builder.

use super::USERS_TABLE;
use super::builder::{Filter, QueryError};
use super::db::Store;
use super::models::{NewUser, UserKey, UserRow, UserSummary};
use crate::auth::{Identity, IdentityStore, Role};

/// Reads and writes rows of the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    store: Store,
}

impl UserRepository {
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn find_by_uid(&self, uid: i64) -> Result<Option<UserRow>, QueryError> {
        self.store
            .select_first(USERS_TABLE, Filter::matching(&UserKey::by_uid(uid)))
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<UserRow>, QueryError> {
        self.store
            .select_first(USERS_TABLE, Filter::all().eq("name", name))
            .await
    }

    /// All users ordered by id, without credentials.
    pub async fn list(&self) -> Result<Vec<UserSummary>, QueryError> {
        let mut users: Vec<UserSummary> = self.store.select(USERS_TABLE, &Filter::all()).await?;
        users.sort_by_key(|u| u.uid);
        Ok(users)
    }

    /// Create a user. A taken name surfaces as [`QueryError::Constraint`].
    pub async fn create(
        &self,
        name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, QueryError> {
        let user = NewUser {
            name: name.to_string(),
            password: password_hash.to_string(),
            role,
        };
        self.store.insert(USERS_TABLE, &user).await
    }

    /// Delete a user. Returns `false` when no such user existed.
    pub async fn delete(&self, uid: i64) -> Result<bool, QueryError> {
        let key = UserKey::by_uid(uid);
        let affected = self.store.delete(USERS_TABLE, &key).await?;
        Ok(affected > 0)
    }

    /// Replace the password hash and bump the token generation in one
    /// statement, so every session issued before the change stops verifying.
    ///
    /// Plain SQL rather than [`Store::update`]: the builder binds literal
    /// values only, and the increment has to happen in place.
    pub async fn set_password(&self, uid: i64, password_hash: &str) -> Result<bool, QueryError> {
        let result = sqlx::query("UPDATE users SET password = ?, tid = tid + 1 WHERE uid = ?")
            .bind(password_hash)
            .bind(uid)
            .execute(self.store.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// True once at least one account exists.
    pub async fn has_users(&self) -> Result<bool, QueryError> {
        let first: Option<UserSummary> = self.store.select_first(USERS_TABLE, Filter::all()).await?;
        Ok(first.is_some())
    }
}

impl IdentityStore for UserRepository {
    async fn identity(&self, uid: i64) -> Result<Option<Identity>, QueryError> {
        Ok(self.find_by_uid(uid).await?.map(|row| Identity {
            uid: row.uid,
            name: row.name,
            role: row.role,
            generation: row.tid,
        }))
    }
}
