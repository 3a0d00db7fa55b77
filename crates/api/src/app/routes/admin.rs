use axum::{extract::Extension, routing::get, Json, Router};

use datahub_auth::UserPrincipal;

pub fn router() -> Router {
    Router::new().route("/ping", get(ping))
}

/// GET /admin/ping - liveness check reachable only by admins
pub async fn ping(Extension(principal): Extension<UserPrincipal>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "admin_id": principal.id(),
    }))
}
