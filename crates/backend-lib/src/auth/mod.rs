// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication: credential hashing, session tokens and the login flow.

pub mod directory;
pub mod password;
pub mod rate_limit;
pub mod token;
pub mod token_generator;
pub mod worker;
mod service;
mod service_impl;

pub use directory::{CredentialRecord, CredentialStore, DirectoryError, InMemoryCredentialStore};
pub use password::{CredentialHasher, PasswordError, Verification};
pub use rate_limit::AuthRateLimiter;
pub use service::{AuthService, IssuedSession};
pub use service_impl::DefaultAuth;
pub use token::{SessionClaim, SessionTokens, TokenError};
pub use worker::HashWorkers;
