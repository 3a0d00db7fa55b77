//! Contract for the identity store consulted during request resolution.
//!
//! Lookups always go through a scoped [`IdentitySession`]. A session holds
//! whatever backing resource the store needs (e.g. a pooled connection) and
//! releases it when dropped, so early returns and aborts cannot leak it.

use async_trait::async_trait;
use thiserror::Error;

use datahub_core::{EnvironmentId, UserId};

use crate::{ApiAccessToken, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identity store unavailable: {0}")]
    Unavailable(String),

    #[error("identity store query failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corrupt identity record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Factory for scoped identity sessions.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn session(&self) -> Result<Box<dyn IdentitySession>, StoreError>;
}

/// Lookups available inside one scoped session.
#[async_trait]
pub trait IdentitySession: Send {
    /// Load a user together with its roles. `Ok(None)` when no such user exists.
    async fn get_user_by_id(&mut self, uid: UserId) -> Result<Option<User>, StoreError>;

    /// Look up a token by its raw value. `Ok(None)` when the token is unknown.
    async fn get_api_access_token(
        &mut self,
        token_string: &str,
    ) -> Result<Option<ApiAccessToken>, StoreError>;

    /// Every environment the user may access, ordered by id.
    async fn get_all_accessible_environment_ids_by_uid(
        &mut self,
        uid: UserId,
    ) -> Result<Vec<EnvironmentId>, StoreError>;
}
