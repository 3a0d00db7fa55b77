//! Request aborts as values.
//!
//! An [`Abort`] stops identity resolution and is rendered into an HTTP response
//! at the request boundary. Status codes stay plain integers here so this crate
//! does not depend on an HTTP library.

use thiserror::Error;

use crate::StoreError;

/// Status used for rejected API access tokens, independent of configuration.
pub const TOKEN_REJECTED_STATUS: u16 = 401;

pub const TOKEN_INVALID: &str = "Token is invalid.";
pub const TOKEN_DISABLED: &str = "Token is disabled.";

/// Configured status codes for the two generic aborts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AbortCodes {
    /// Identity missing or invalid.
    pub unauthorized: u16,
    /// Identity present, access restricted.
    pub access_restricted: u16,
}

impl Default for AbortCodes {
    fn default() -> Self {
        Self {
            unauthorized: 401,
            access_restricted: 403,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request aborted with status {status}")]
pub struct Abort {
    pub status: u16,
    pub description: Option<String>,
}

impl Abort {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            description: None,
        }
    }

    pub fn with_description(status: u16, description: impl Into<String>) -> Self {
        Self {
            status,
            description: Some(description.into()),
        }
    }

    pub fn invalid_token() -> Self {
        Self::with_description(TOKEN_REJECTED_STATUS, TOKEN_INVALID)
    }

    pub fn disabled_token() -> Self {
        Self::with_description(TOKEN_REJECTED_STATUS, TOKEN_DISABLED)
    }
}

/// Authorization is required.
pub fn abort_unauthorized(codes: &AbortCodes) -> Abort {
    Abort::new(codes.unauthorized)
}

/// The caller is known but may not access the resource.
pub fn abort_forbidden(codes: &AbortCodes) -> Abort {
    Abort::new(codes.access_restricted)
}

/// Failure while resolving the identity of a request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Abort(#[from] Abort),

    #[error(transparent)]
    Store(#[from] StoreError),
}
