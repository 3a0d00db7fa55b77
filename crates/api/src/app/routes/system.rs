use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use datahub_auth::{SessionPrincipal, UserPrincipal};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn current_user(Extension(principal): Extension<UserPrincipal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "id": principal.id(),
        "session_key": principal.session_key(),
        "username": principal.username(),
        "is_admin": principal.is_admin(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
