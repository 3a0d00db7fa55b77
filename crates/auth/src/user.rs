//! Persisted identity records as handed out by the identity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use datahub_core::{ApiTokenId, UserId};

use crate::Role;

/// A user row loaded together with its roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub deleted: bool,
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// An API access token row.
///
/// Only the digest of the raw token is stored; the raw value is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAccessToken {
    pub id: ApiTokenId,
    pub token_hash: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub creator_uid: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<UserId>,
}
