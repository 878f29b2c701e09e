// ============================
// crates/common/src/lib.rs
// ============================
//! Common types and structures
//! shared between the `warden` server and its HTTP clients.
//! This module defines the JSON bodies of the credential and session endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role carried by a session claim.
///
/// The set is closed; policy rules name the roles they accept explicitly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Returned when parsing a role name outside the closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

/// Body of `POST /api/hash`
///
/// `secret` is optional at the wire level so that a missing field is reported
/// the same way as an empty one.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HashRequest {
    #[serde(default)]
    pub secret: Option<String>,
}

/// Response of `POST /api/hash`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HashResponse {
    /// Self-describing PHC string
    pub hash: String,
}

/// Body of `POST /api/verify`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VerifyRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Response of `POST /api/verify`
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct VerifyResponse {
    pub matches: bool,
}

/// Body of `POST /api/register` and `POST /api/login`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Public view of an authenticated session
/// # Fields
/// * `user_id` - Opaque identity the session was issued for
/// * `role` - Role claim
/// * `expires_at` - Instant after which the token is rejected
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub user_id: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Response of a successful registration or login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionResponse {
    pub identity: String,
    pub session: SessionView,
}

/// Identifier assigned to an account when it registers
pub type UserId = Uuid;

/// JSON error envelope produced by the server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
