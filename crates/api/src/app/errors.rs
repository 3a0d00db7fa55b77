use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use datahub_auth::{Abort, AuthError, StoreError};

/// Error returned by middleware and handlers; rendered at the request boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Abort(#[from] Abort),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Abort(abort) => Self::Abort(abort),
            AuthError::Store(err) => Self::Store(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Abort(abort) => abort_response(abort),
            ApiError::Store(err) => {
                error!(error = %err, "identity store failure");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "identity store unavailable",
                )
            }
        }
    }
}

/// Plain-text response for an abort; the body is the description, or the
/// status reason phrase when there is none.
fn abort_response(abort: Abort) -> Response {
    let status = StatusCode::from_u16(abort.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = abort
        .description
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_uses_its_status_and_description() {
        let res = ApiError::from(Abort::disabled_token()).into_response();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn configured_status_codes_pass_through() {
        let res = ApiError::from(Abort::new(451)).into_response();
        assert_eq!(res.status().as_u16(), 451);
    }

    #[test]
    fn store_failures_are_500() {
        let res = ApiError::from(StoreError::Unavailable("down".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
