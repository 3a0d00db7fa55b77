use std::sync::Arc;

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Key, SignedCookieJar};

use datahub_auth::{abort_forbidden, abort_unauthorized};

use crate::app::errors::ApiError;
use crate::context::CurrentUser;
use crate::login::LoginManager;

#[derive(Clone)]
pub struct AuthState {
    pub login: Arc<LoginManager>,
    pub cookie_key: Key,
    pub session_cookie_name: Arc<str>,
}

impl AuthState {
    pub fn new(login: LoginManager, cookie_key: Key, session_cookie_name: impl Into<Arc<str>>) -> Self {
        Self {
            login: Arc::new(login),
            cookie_key,
            session_cookie_name: session_cookie_name.into(),
        }
    }
}

impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Resolve the request identity and attach it as [`CurrentUser`].
///
/// Token aborts end the request here; an anonymous request continues.
pub async fn identity_middleware(
    State(state): State<AuthState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_uid = jar
        .get(&state.session_cookie_name)
        .map(|cookie| cookie.value().to_owned());

    let principal = state
        .login
        .resolve(req.headers(), session_uid.as_deref())
        .await?;

    req.extensions_mut().insert(CurrentUser::new(principal));
    Ok(next.run(req).await)
}

/// Reject anonymous requests; expose the principal as `Extension<UserPrincipal>`.
pub async fn login_required(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(CurrentUser::principal)
        .cloned()
        .ok_or_else(|| abort_unauthorized(state.login.abort_codes()))?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Reject principals without the admin role. Runs after [`login_required`].
pub async fn admin_required(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let is_admin = req
        .extensions()
        .get::<CurrentUser>()
        .and_then(CurrentUser::principal)
        .is_some_and(|principal| principal.is_admin());

    if !is_admin {
        return Err(abort_forbidden(state.login.abort_codes()).into());
    }

    Ok(next.run(req).await)
}
