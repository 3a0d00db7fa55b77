//! Login manager: turns an inbound request into a [`UserPrincipal`].
//!
//! Two resolvers are consulted in order:
//!
//! 1. `api-access-token` header: a bad or disabled token aborts the request.
//! 2. The user id carried by the session cookie: anything unusable is anonymous.
//!
//! The manager is built once at startup and shared through router state.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, warn};

use datahub_auth::{Abort, AbortCodes, AuthError, IdentityStore, StoreError, UserPrincipal};
use datahub_core::UserId;

/// Request header carrying a raw API access token.
pub const API_ACCESS_TOKEN_HEADER: &str = "api-access-token";

/// Session value meaning "no user"; matched case-insensitively.
pub const ANONYMOUS_SESSION_UID: &str = "none";

pub struct LoginManager {
    store: Arc<dyn IdentityStore>,
    abort_codes: AbortCodes,
}

impl LoginManager {
    pub fn new(store: Arc<dyn IdentityStore>, abort_codes: AbortCodes) -> Self {
        Self { store, abort_codes }
    }

    pub fn abort_codes(&self) -> &AbortCodes {
        &self.abort_codes
    }

    /// Resolve the request identity: token header first, then the session id.
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        session_uid: Option<&str>,
    ) -> Result<Option<UserPrincipal>, AuthError> {
        if let Some(principal) = self.load_user_with_api_access_token(headers).await? {
            return Ok(Some(principal));
        }

        Ok(self.load_user(session_uid).await?)
    }

    /// Resolve the user id stored in the session.
    ///
    /// Missing, sentinel, malformed, and unknown ids all resolve to `None`.
    pub async fn load_user(&self, uid: Option<&str>) -> Result<Option<UserPrincipal>, StoreError> {
        let Some(uid) = uid.filter(|uid| !uid.is_empty()) else {
            return Ok(None);
        };
        if uid.eq_ignore_ascii_case(ANONYMOUS_SESSION_UID) {
            return Ok(None);
        }

        let uid = match uid.parse::<UserId>() {
            Ok(uid) => uid,
            Err(err) => {
                debug!(error = %err, "ignoring malformed session user id");
                return Ok(None);
            }
        };

        let mut session = self.store.session().await?;
        match session.get_user_by_id(uid).await? {
            Some(user) => Ok(Some(UserPrincipal::new(user, self.store.clone()))),
            None => {
                debug!(%uid, "session refers to a missing user");
                Ok(None)
            }
        }
    }

    /// Resolve the `api-access-token` header.
    ///
    /// No header yields `Ok(None)`. A token that is unknown, disabled, or whose
    /// creator no longer exists aborts with 401.
    pub async fn load_user_with_api_access_token(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<UserPrincipal>, AuthError> {
        let Some(value) = headers.get(API_ACCESS_TOKEN_HEADER) else {
            return Ok(None);
        };
        if value.is_empty() {
            return Ok(None);
        }
        let Ok(token_string) = value.to_str() else {
            warn!("rejecting api access token: header is not valid ASCII");
            return Err(Abort::invalid_token().into());
        };

        let mut session = self.store.session().await?;

        let Some(token) = session.get_api_access_token(token_string).await? else {
            warn!("rejecting api access token: unknown token");
            return Err(Abort::invalid_token().into());
        };

        if !token.enabled {
            warn!(token_id = %token.id, "rejecting api access token: token is disabled");
            return Err(Abort::disabled_token().into());
        }

        match session.get_user_by_id(token.creator_uid).await? {
            Some(user) => Ok(Some(UserPrincipal::new(user, self.store.clone()))),
            None => {
                warn!(
                    token_id = %token.id,
                    creator_uid = %token.creator_uid,
                    "rejecting api access token: creator no longer exists"
                );
                Err(Abort::invalid_token().into())
            }
        }
    }
}

impl core::fmt::Debug for LoginManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginManager")
            .field("abort_codes", &self.abort_codes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use datahub_auth::{IdentitySession, Role, User};
    use datahub_infra::InMemoryIdentityStore;

    use super::*;

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

    fn manager() -> (InMemoryIdentityStore, LoginManager) {
        let store = InMemoryIdentityStore::new();
        store.insert_user(user(1, vec![])).unwrap();
        store.insert_user(user(2, vec![Role::ADMIN])).unwrap();
        store
            .insert_api_access_token("good-token", UserId::new(2), true)
            .unwrap();
        store
            .insert_api_access_token("off-token", UserId::new(2), false)
            .unwrap();
        store
            .insert_api_access_token("orphan-token", UserId::new(99), true)
            .unwrap();

        let login = LoginManager::new(Arc::new(store.clone()), AbortCodes::default());
        (store, login)
    }

    fn token_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_ACCESS_TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        headers
    }

    struct UnreachableStore;

    #[async_trait]
    impl IdentityStore for UnreachableStore {
        async fn session(&self) -> Result<Box<dyn IdentitySession>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    fn abort_of(err: AuthError) -> Abort {
        match err {
            AuthError::Abort(abort) => abort,
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_and_sentinel_session_ids_are_anonymous() {
        let (store, login) = manager();

        for uid in [None, Some(""), Some("  "), Some("none"), Some("None")] {
            assert!(login.load_user(uid).await.unwrap().is_none(), "uid {uid:?}");
        }
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn unknown_or_malformed_session_ids_are_anonymous() {
        let (_store, login) = manager();

        assert!(login.load_user(Some("404")).await.unwrap().is_none());
        assert!(login.load_user(Some("not-a-number")).await.unwrap().is_none());
        assert!(login.load_user(Some(" 1 ")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn existing_session_id_resolves_to_that_user() {
        let (store, login) = manager();

        let principal = login.load_user(Some("1")).await.unwrap().unwrap();

        assert_eq!(principal.id(), UserId::new(1));
        assert!(!principal.is_admin());
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn missing_token_header_falls_through() {
        let (_store, login) = manager();

        let resolved = login
            .load_user_with_api_access_token(&HeaderMap::new())
            .await
            .unwrap();
        assert!(resolved.is_none());

        let resolved = login
            .load_user_with_api_access_token(&token_headers(""))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn unknown_token_aborts_as_invalid() {
        let (store, login) = manager();

        let err = login
            .load_user_with_api_access_token(&token_headers("nope"))
            .await
            .unwrap_err();

        assert_eq!(abort_of(err), Abort::invalid_token());
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn disabled_token_aborts_as_disabled() {
        let (store, login) = manager();

        let err = login
            .load_user_with_api_access_token(&token_headers("off-token"))
            .await
            .unwrap_err();

        let abort = abort_of(err);
        assert_eq!(abort.status, 401);
        assert_eq!(abort.description.as_deref(), Some("Token is disabled."));
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn enabled_token_resolves_to_its_creator() {
        let (_store, login) = manager();

        let principal = login
            .load_user_with_api_access_token(&token_headers("good-token"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(principal.id(), UserId::new(2));
        assert!(principal.is_admin());
    }

    #[tokio::test]
    async fn token_whose_creator_is_gone_is_invalid() {
        let (_store, login) = manager();

        let err = login
            .load_user_with_api_access_token(&token_headers("orphan-token"))
            .await
            .unwrap_err();

        assert_eq!(abort_of(err), Abort::invalid_token());
    }

    #[tokio::test]
    async fn re_enabled_token_is_accepted_again() {
        let (store, login) = manager();
        store.set_api_access_token_enabled("off-token", true).unwrap();

        let principal = login
            .load_user_with_api_access_token(&token_headers("off-token"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(principal.id(), UserId::new(2));
    }

    #[tokio::test]
    async fn token_takes_precedence_over_session() {
        let (_store, login) = manager();

        let principal = login
            .resolve(&token_headers("good-token"), Some("1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.id(), UserId::new(2));

        let err = login
            .resolve(&token_headers("nope"), Some("1"))
            .await
            .unwrap_err();
        assert_eq!(abort_of(err), Abort::invalid_token());
    }

    #[tokio::test]
    async fn session_is_used_when_no_token_is_sent() {
        let (_store, login) = manager();

        let principal = login.resolve(&HeaderMap::new(), Some("1")).await.unwrap();
        assert_eq!(principal.map(|p| p.id()), Some(UserId::new(1)));

        let anonymous = login.resolve(&HeaderMap::new(), Some("none")).await.unwrap();
        assert!(anonymous.is_none());
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_anonymous() {
        let login = LoginManager::new(Arc::new(UnreachableStore), AbortCodes::default());

        let err = login.resolve(&HeaderMap::new(), Some("1")).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Unavailable(_))));

        let err = login
            .resolve(&token_headers("good-token"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Unavailable(_))));

        let anonymous = login.resolve(&HeaderMap::new(), Some("none")).await.unwrap();
        assert!(anonymous.is_none());
    }
}
