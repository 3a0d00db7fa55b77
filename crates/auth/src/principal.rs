use std::sync::Arc;

use datahub_core::{EnvironmentId, UserId};

use crate::{IdentityStore, Role, StoreError, User};

/// What the session layer needs from an authenticated principal.
pub trait SessionPrincipal {
    type Id: Copy + Eq + core::fmt::Display;

    fn id(&self) -> Self::Id;

    /// Key stored in the session to find this principal again.
    fn session_key(&self) -> String {
        self.id().to_string()
    }
}

/// Read-only view of a user for the lifetime of one request.
///
/// Identity and roles are captured when the principal is built; later role
/// changes in storage are not observed. Accessible environments are the
/// exception and are fetched from the store on every call.
#[derive(Clone)]
pub struct UserPrincipal {
    id: UserId,
    username: String,
    roles: Vec<Role>,
    is_admin: bool,
    store: Arc<dyn IdentityStore>,
}

impl UserPrincipal {
    /// Wrap a loaded user. Taking the record by value means a principal can only
    /// exist for a user that was actually found.
    pub fn new(user: User, store: Arc<dyn IdentityStore>) -> Self {
        let is_admin = user.roles.iter().any(Role::is_admin);
        Self {
            id: user.id,
            username: user.username,
            roles: user.roles,
            is_admin,
            store,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub async fn accessible_environment_ids(&self) -> Result<Vec<EnvironmentId>, StoreError> {
        let mut session = self.store.session().await?;
        session
            .get_all_accessible_environment_ids_by_uid(self.id)
            .await
    }
}

impl SessionPrincipal for UserPrincipal {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

impl core::fmt::Debug for UserPrincipal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserPrincipal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{ApiAccessToken, IdentitySession};

    #[derive(Default)]
    struct CountingStore {
        envs: Mutex<Vec<EnvironmentId>>,
        lookups: AtomicUsize,
    }

    struct CountingSession(Arc<CountingStore>);

    #[async_trait]
    impl IdentityStore for Arc<CountingStore> {
        async fn session(&self) -> Result<Box<dyn IdentitySession>, StoreError> {
            Ok(Box::new(CountingSession(self.clone())))
        }
    }

    #[async_trait]
    impl IdentitySession for CountingSession {
        async fn get_user_by_id(&mut self, _uid: UserId) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn get_api_access_token(
            &mut self,
            _token_string: &str,
        ) -> Result<Option<ApiAccessToken>, StoreError> {
            Ok(None)
        }

        async fn get_all_accessible_environment_ids_by_uid(
            &mut self,
            _uid: UserId,
        ) -> Result<Vec<EnvironmentId>, StoreError> {
            self.0.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.envs.lock().unwrap().clone())
        }
    }

    fn user(id: i64, roles: Vec<Role>) -> User {
        User {
            id: UserId::new(id),
            username: format!("user{id}"),
            fullname: None,
            email: None,
            deleted: false,
            roles,
        }
    }

    #[test]
    fn admin_flag_comes_from_roles() {
        let store: Arc<dyn IdentityStore> = Arc::new(Arc::new(CountingStore::default()));

        let admin = UserPrincipal::new(user(1, vec![Role::new("viewer"), Role::ADMIN]), store.clone());
        let viewer = UserPrincipal::new(user(2, vec![Role::new("viewer")]), store);

        assert!(admin.is_admin());
        assert!(!viewer.is_admin());
    }

    #[test]
    fn admin_flag_is_a_snapshot() {
        let store: Arc<dyn IdentityStore> = Arc::new(Arc::new(CountingStore::default()));
        let mut record = user(3, vec![]);
        let principal = UserPrincipal::new(record.clone(), store);

        record.roles.push(Role::ADMIN);

        assert!(record.has_role(&Role::ADMIN));
        assert!(!principal.is_admin());
    }

    #[test]
    fn session_key_is_the_stringified_id() {
        let store: Arc<dyn IdentityStore> = Arc::new(Arc::new(CountingStore::default()));
        let principal = UserPrincipal::new(user(42, vec![]), store);

        assert_eq!(SessionPrincipal::id(&principal), UserId::new(42));
        assert_eq!(principal.session_key(), "42");
    }

    #[tokio::test]
    async fn environment_ids_are_fetched_on_every_call() {
        let counting = Arc::new(CountingStore::default());
        counting.envs.lock().unwrap().extend([EnvironmentId::new(1), EnvironmentId::new(5)]);
        let store: Arc<dyn IdentityStore> = Arc::new(counting.clone());
        let principal = UserPrincipal::new(user(7, vec![]), store);

        assert_eq!(
            principal.accessible_environment_ids().await.unwrap(),
            vec![EnvironmentId::new(1), EnvironmentId::new(5)]
        );

        counting.envs.lock().unwrap().push(EnvironmentId::new(9));

        assert_eq!(principal.accessible_environment_ids().await.unwrap().len(), 3);
        assert_eq!(counting.lookups.load(Ordering::SeqCst), 2);
    }
}
