//! `devtrack-auth`: identity and authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to mint/verify bearer tokens, hash passwords, and decide whether a
//! principal may perform an action given its project role.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, Decision, DenyReason, ProjectAccess, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{
    DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST, PasswordError, hash_password, verify_password,
};
pub use permissions::Action;
pub use principal::Principal;
pub use roles::Role;
pub use token::{Hs256TokenCodec, TokenCodec, TokenError};
