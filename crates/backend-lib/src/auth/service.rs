// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::token::SessionClaim;
use crate::error::AppError;

/// A freshly minted session, ready to be handed to the client
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub identity: String,
    pub token: String,
    pub claim: SessionClaim,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account and open a session for it
    async fn register(
        &self,
        identity: &str,
        secret: Zeroizing<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError>;

    /// Check credentials presented by `client` and open a session
    async fn login(
        &self,
        client: &str,
        identity: &str,
        secret: Zeroizing<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError>;
}
