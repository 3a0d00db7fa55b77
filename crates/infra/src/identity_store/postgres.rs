//! Postgres-backed identity store.
//!
//! A session is one pooled connection (`PoolConnection<Postgres>`). It goes back
//! to the pool when the session is dropped, on every exit path.
//!
//! Schema: `migrations/0001_identity.sql`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | PoolTimedOut / PoolClosed | `Unavailable` |
//! | ColumnDecode / Decode | `Corrupt` |
//! | anything else | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use datahub_auth::{ApiAccessToken, IdentitySession, IdentityStore, Role, StoreError, User};
use datahub_core::{ApiTokenId, EnvironmentId, UserId};

use super::hash_api_access_token;

#[derive(Debug, Clone)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a lazily-initialised pool; no connection is made until first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect_lazy(database_url).map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn session(&self) -> Result<Box<dyn IdentitySession>, StoreError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        Ok(Box::new(PgIdentitySession { conn }))
    }
}

struct PgIdentitySession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl IdentitySession for PgIdentitySession {
    #[instrument(skip(self), err)]
    async fn get_user_by_id(&mut self, uid: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, fullname, email, deleted
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(uid.get())
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("get_user_by_id", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let roles: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
            ORDER BY role ASC
            "#,
        )
        .bind(uid.get())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("get_user_roles", e))?;

        let user = User {
            id: UserId::new(row.try_get("id").map_err(|e| map_sqlx_error("get_user_by_id", e))?),
            username: row
                .try_get("username")
                .map_err(|e| map_sqlx_error("get_user_by_id", e))?,
            fullname: row
                .try_get("fullname")
                .map_err(|e| map_sqlx_error("get_user_by_id", e))?,
            email: row
                .try_get("email")
                .map_err(|e| map_sqlx_error("get_user_by_id", e))?,
            deleted: row
                .try_get("deleted")
                .map_err(|e| map_sqlx_error("get_user_by_id", e))?,
            roles: roles.into_iter().map(Role::new).collect(),
        };

        Ok(Some(user))
    }

    #[instrument(skip_all, err)]
    async fn get_api_access_token(
        &mut self,
        token_string: &str,
    ) -> Result<Option<ApiAccessToken>, StoreError> {
        let token_hash = hash_api_access_token(token_string);

        let row: Option<ApiAccessTokenRow> = sqlx::query_as(
            r#"
            SELECT id, token_hash, description, enabled, creator_uid,
                   created_at, updated_at, updated_by
            FROM api_access_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("get_api_access_token", e))?;

        Ok(row.map(ApiAccessToken::from))
    }

    #[instrument(skip(self), err)]
    async fn get_all_accessible_environment_ids_by_uid(
        &mut self,
        uid: UserId,
    ) -> Result<Vec<EnvironmentId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT e.id
            FROM environments e
            WHERE e.deleted_at IS NULL
              AND (
                e.public
                OR EXISTS (
                    SELECT 1 FROM environment_users eu
                    WHERE eu.environment_id = e.id AND eu.user_id = $1
                )
              )
            ORDER BY e.id ASC
            "#,
        )
        .bind(uid.get())
        .fetch_all(&mut *self.conn)
        .await
        .map_err(|e| map_sqlx_error("get_all_accessible_environment_ids_by_uid", e))?;

        Ok(ids.into_iter().map(EnvironmentId::new).collect())
    }
}

struct ApiAccessTokenRow {
    id: i64,
    token_hash: String,
    description: Option<String>,
    enabled: bool,
    creator_uid: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ApiAccessTokenRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ApiAccessTokenRow {
            id: row.try_get("id")?,
            token_hash: row.try_get("token_hash")?,
            description: row.try_get("description")?,
            enabled: row.try_get("enabled")?,
            creator_uid: row.try_get("creator_uid")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
        })
    }
}

impl From<ApiAccessTokenRow> for ApiAccessToken {
    fn from(row: ApiAccessTokenRow) -> Self {
        ApiAccessToken {
            id: ApiTokenId::new(row.id),
            token_hash: row.token_hash,
            description: row.description,
            enabled: row.enabled,
            creator_uid: UserId::new(row.creator_uid),
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by.map(UserId::new),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("{operation}: {err}"))
        }
        other => StoreError::backend(other),
    }
}
