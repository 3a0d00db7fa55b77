//! Identity store implementations.
//!
//! Both stores implement [`datahub_auth::IdentityStore`]; the API layer only
//! sees the trait object.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryIdentityStore;
pub use postgres::PostgresIdentityStore;

use sha2::{Digest, Sha512};

/// Digest under which a raw API access token is stored.
pub fn hash_api_access_token(token_string: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(token_string.as_bytes());
    hex::encode(hasher.finalize())
}
