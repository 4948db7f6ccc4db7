//! # Auth Module
//!
//! Authentication and session management:
//! - password registration and login (Argon2id hashes)
//! - access / refresh JWT issuance and verification
//! - server-side sessions for the OAuth redirect handshake
//! - Google sign-in through an injected identity provider
//! - the `AuthedUser` extractor and role gate used by protected routes

pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod password;
pub mod routes;
pub mod session;
pub mod tokens;
pub mod validators;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use gate::{ADMIN_ONLY, SELF_OR_ADMIN};
pub use routes::auth_routes;
