//! Process configuration loaded from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use datahub_auth::AbortCodes;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "session";

/// Shortest secret accepted for signing session cookies.
pub const MIN_SECRET_KEY_LEN: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid socket address '{value}'")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var}: '{value}' is not an HTTP status code")]
    InvalidStatusCode { var: &'static str, value: String },

    #[error("SECRET_KEY must be at least 64 bytes (got {0})")]
    SecretKeyTooShort(usize),

    #[error("SESSION_COOKIE_NAME must not be empty")]
    EmptyCookieName,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// `None` runs against the in-memory identity store.
    pub database_url: Option<String>,
    /// `None` signs session cookies with a per-process random key.
    pub secret_key: Option<String>,
    pub session_cookie_name: String,
    pub abort_codes: AbortCodes,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = {
            let value = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
            value
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidAddr {
                    var: "BIND_ADDR",
                    value,
                })?
        };

        let secret_key = non_empty("SECRET_KEY");
        if let Some(key) = &secret_key {
            if key.len() < MIN_SECRET_KEY_LEN {
                return Err(ConfigError::SecretKeyTooShort(key.len()));
            }
        }

        let session_cookie_name = match lookup("SESSION_COOKIE_NAME") {
            Some(name) if name.trim().is_empty() => return Err(ConfigError::EmptyCookieName),
            Some(name) => name.trim().to_string(),
            None => DEFAULT_SESSION_COOKIE_NAME.to_string(),
        };

        let defaults = AbortCodes::default();
        let abort_codes = AbortCodes {
            unauthorized: status_code(
                "UNAUTHORIZED_STATUS_CODE",
                non_empty("UNAUTHORIZED_STATUS_CODE"),
                defaults.unauthorized,
            )?,
            access_restricted: status_code(
                "ACCESS_RESTRICTED_STATUS_CODE",
                non_empty("ACCESS_RESTRICTED_STATUS_CODE"),
                defaults.access_restricted,
            )?,
        };

        Ok(Self {
            bind_addr,
            database_url: non_empty("DATABASE_URL"),
            secret_key,
            session_cookie_name,
            abort_codes,
        })
    }
}

fn status_code(var: &'static str, value: Option<String>, default: u16) -> Result<u16, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.trim().parse::<u16>() {
        Ok(code) if (100..=599).contains(&code) => Ok(code),
        _ => Err(ConfigError::InvalidStatusCode { var, value }),
    }
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("session_cookie_name", &self.session_cookie_name)
            .field("abort_codes", &self.abort_codes)
            .finish()
    }
}
