//! Authentication for Vault
//!
//! Provides:
//! - JWT bearer token issuance and validation
//! - Password hashing with Argon2
//! - The `AuthUser` request extractor used by every capsule route

mod extract;
mod jwt;
mod password;

pub use extract::AuthUser;
pub use jwt::{JwtService, extract_bearer};
pub use password::{hash_password, verify_password};
