use axum::{extract::Extension, Json};
use serde::Serialize;

use datahub_auth::UserPrincipal;
use datahub_core::EnvironmentId;

use crate::app::errors::ApiError;

#[derive(Debug, Serialize)]
pub struct AccessibleEnvironments {
    pub environment_ids: Vec<EnvironmentId>,
}

/// GET /self/environments - environments the caller may access, read fresh each time
pub async fn list_accessible(
    Extension(principal): Extension<UserPrincipal>,
) -> Result<Json<AccessibleEnvironments>, ApiError> {
    let environment_ids = principal.accessible_environment_ids().await?;
    Ok(Json(AccessibleEnvironments { environment_ids }))
}
