//! Infrastructure layer: identity storage and configuration.

pub mod config;
pub mod identity_store;

pub use config::{ConfigError, Settings};
pub use identity_store::{InMemoryIdentityStore, PostgresIdentityStore, hash_api_access_token};
