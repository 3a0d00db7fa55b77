use axum::{routing::get, Router};

pub mod admin;
pub mod environments;
pub mod system;

/// Router for all endpoints that need an authenticated principal.
pub fn router() -> Router {
    Router::new()
        .route("/self", get(system::current_user))
        .route("/self/environments", get(environments::list_accessible))
}
