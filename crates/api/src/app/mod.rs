//! HTTP API application wiring (Axum router + identity layers).
//!
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: error-to-response mapping

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower::ServiceBuilder;

use crate::middleware::{self, AuthState};

pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Layer order on protected routes, outermost first: identity resolution,
/// login required, then admin required for `/admin`.
pub fn build_app(state: AuthState) -> Router {
    let admin = routes::admin::router().route_layer(from_fn_with_state(
        state.clone(),
        middleware::admin_required,
    ));

    let protected = routes::router()
        .nest("/admin", admin)
        .route_layer(from_fn_with_state(state.clone(), middleware::login_required))
        .route_layer(from_fn_with_state(state, middleware::identity_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
