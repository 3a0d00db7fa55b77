//! `datahub-auth` — request identity: principals, aborts, and the identity store contract.
//!
//! This crate is intentionally decoupled from HTTP and from any concrete database.

pub mod abort;
pub mod directory;
pub mod principal;
pub mod roles;
pub mod user;

pub use abort::{Abort, AbortCodes, AuthError, abort_forbidden, abort_unauthorized};
pub use directory::{IdentitySession, IdentityStore, StoreError};
pub use principal::{SessionPrincipal, UserPrincipal};
pub use roles::Role;
pub use user::{ApiAccessToken, User};
