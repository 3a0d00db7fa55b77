use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use datahub_auth::{ApiAccessToken, IdentitySession, IdentityStore, Role, StoreError, User};
use datahub_core::{ApiTokenId, EnvironmentId, UserId};

use super::hash_api_access_token;

#[derive(Debug, Clone, Copy)]
struct EnvironmentRecord {
    public: bool,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    tokens: HashMap<String, ApiAccessToken>,
    environments: BTreeMap<EnvironmentId, EnvironmentRecord>,
    members: HashSet<(EnvironmentId, UserId)>,
    next_token_id: i64,
}

/// In-memory identity store.
///
/// Intended for tests/dev. Tracks how many sessions are open so callers can
/// check that every session was released.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
    open_sessions: Arc<AtomicUsize>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn grant_role(&self, uid: UserId, role: Role) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if let Some(user) = tables.users.get_mut(&uid) {
            if !user.has_role(&role) {
                user.roles.push(role);
            }
        }
        Ok(())
    }

    /// Store a token for `creator_uid`. Only the digest of `token_string` is kept.
    pub fn insert_api_access_token(
        &self,
        token_string: &str,
        creator_uid: UserId,
        enabled: bool,
    ) -> Result<ApiAccessToken, StoreError> {
        let mut tables = self.write()?;

        tables.next_token_id += 1;
        let now = Utc::now();
        let token = ApiAccessToken {
            id: ApiTokenId::new(tables.next_token_id),
            token_hash: hash_api_access_token(token_string),
            description: None,
            enabled,
            creator_uid,
            created_at: now,
            updated_at: now,
            updated_by: None,
        };
        tables.tokens.insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    pub fn set_api_access_token_enabled(
        &self,
        token_string: &str,
        enabled: bool,
    ) -> Result<(), StoreError> {
        let hash = hash_api_access_token(token_string);
        if let Some(token) = self.write()?.tokens.get_mut(&hash) {
            token.enabled = enabled;
            token.updated_at = Utc::now();
        }
        Ok(())
    }

    pub fn insert_environment(&self, id: EnvironmentId, public: bool) -> Result<(), StoreError> {
        self.write()?.environments.insert(
            id,
            EnvironmentRecord {
                public,
                deleted: false,
            },
        );
        Ok(())
    }

    pub fn delete_environment(&self, id: EnvironmentId) -> Result<(), StoreError> {
        if let Some(env) = self.write()?.environments.get_mut(&id) {
            env.deleted = true;
        }
        Ok(())
    }

    pub fn add_environment_member(&self, id: EnvironmentId, uid: UserId) -> Result<(), StoreError> {
        self.write()?.members.insert((id, uid));
        Ok(())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn session(&self) -> Result<Box<dyn IdentitySession>, StoreError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            store: self.clone(),
        }))
    }
}

struct InMemorySession {
    store: InMemoryIdentityStore,
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentitySession for InMemorySession {
    async fn get_user_by_id(&mut self, uid: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.store.read()?.users.get(&uid).cloned())
    }

    async fn get_api_access_token(
        &mut self,
        token_string: &str,
    ) -> Result<Option<ApiAccessToken>, StoreError> {
        let hash = hash_api_access_token(token_string);
        Ok(self.store.read()?.tokens.get(&hash).cloned())
    }

    async fn get_all_accessible_environment_ids_by_uid(
        &mut self,
        uid: UserId,
    ) -> Result<Vec<EnvironmentId>, StoreError> {
        let tables = self.store.read()?;
        Ok(tables
            .environments
            .iter()
            .filter(|(id, env)| !env.deleted && (env.public || tables.members.contains(&(**id, uid))))
            .map(|(id, _)| *id)
            .collect())
    }
}
