// ============================
// crates/backend-lib/src/auth/service_impl.rs
// ============================
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{error, info, warn};
use warden_common::Role;
use zeroize::Zeroizing;

use super::directory::{CredentialRecord, CredentialStore};
use super::password::{CredentialHasher, PasswordError, Verification};
use super::rate_limit::AuthRateLimiter;
use super::service::{AuthService, IssuedSession};
use super::token::SessionTokens;
use super::token_generator::generate_secure_token;
use super::worker::HashWorkers;
use crate::error::AppError;
use crate::metrics::{
    AUTH_LOGIN_FAILURE, AUTH_LOGIN_SUCCESS, AUTH_REGISTER, AUTH_REHASH, SESSION_ISSUED,
};

/// Longest identity accepted (the practical limit of an email address)
const MAX_IDENTITY_LEN: usize = 254;

pub struct DefaultAuth {
    hasher: Arc<CredentialHasher>,
    workers: HashWorkers,
    store: Arc<dyn CredentialStore>,
    tokens: Arc<SessionTokens>,
    limiter: AuthRateLimiter,
    admins: HashSet<String>,
    /// Verified against when the identity is unknown, so both paths cost the same
    dummy_hash: String,
}

impl DefaultAuth {
    pub fn new(
        hasher: Arc<CredentialHasher>,
        workers: HashWorkers,
        store: Arc<dyn CredentialStore>,
        tokens: Arc<SessionTokens>,
        limiter: AuthRateLimiter,
        admin_identities: &[String],
    ) -> Result<Self, PasswordError> {
        let dummy_hash = hasher.hash(&generate_secure_token())?;
        Ok(Self {
            hasher,
            workers,
            store,
            tokens,
            limiter,
            admins: admin_identities.iter().map(|i| i.trim().to_string()).collect(),
            dummy_hash,
        })
    }

    fn open_session(&self, identity: String, record_id: &str, role: Role, now: DateTime<Utc>) -> IssuedSession {
        let (token, claim) = self.tokens.issue(record_id, role, now);
        counter!(SESSION_ISSUED).increment(1);
        IssuedSession {
            identity,
            token,
            claim,
        }
    }
}

fn normalize_identity(identity: &str) -> Result<String, AppError> {
    let identity = identity.trim();
    if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
        return Err(AppError::InvalidInput("identity must be 1..=254 bytes".into()));
    }
    Ok(identity.to_string())
}

#[async_trait]
impl AuthService for DefaultAuth {
    async fn register(
        &self,
        identity: &str,
        secret: Zeroizing<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError> {
        let identity = normalize_identity(identity)?;
        if secret.is_empty() {
            return Err(PasswordError::InvalidInput.into());
        }

        let hasher = Arc::clone(&self.hasher);
        let hash = self.workers.run(move || hasher.hash(&secret)).await??;

        let role = if self.admins.contains(&identity) {
            Role::Admin
        } else {
            Role::User
        };
        let record = CredentialRecord::new(&identity, hash, role);
        let user_id = record.user_id;
        self.store.insert(record).await?;

        counter!(AUTH_REGISTER).increment(1);
        info!(%user_id, %role, "account registered");
        Ok(self.open_session(identity, &user_id.to_string(), role, now))
    }

    async fn login(
        &self,
        client: &str,
        identity: &str,
        secret: Zeroizing<String>,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AppError> {
        if !self.limiter.check_rate_limit(client) {
            counter!(AUTH_LOGIN_FAILURE, "reason" => "rate_limited").increment(1);
            return Err(AppError::AuthRateLimited);
        }
        let identity = normalize_identity(identity)?;
        if secret.is_empty() {
            return Err(PasswordError::InvalidInput.into());
        }

        let record = self.store.find(&identity).await;
        let stored = record
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |r| r.hash.clone());

        let hasher = Arc::clone(&self.hasher);
        let verification = self
            .workers
            .run(move || hasher.verify_and_upgrade(&secret, &stored))
            .await?
            .map_err(|e| match e {
                PasswordError::MalformedHash => {
                    error!(identity = %identity, "stored credential hash is malformed");
                    AppError::Internal("stored credential hash is malformed".into())
                },
                other => other.into(),
            })?;

        let record = match (record, verification) {
            (Some(record), Verification::Match { upgraded }) => {
                if let Some(new_hash) = upgraded {
                    match self.store.replace_hash(&record.identity, new_hash).await {
                        Ok(()) => {
                            counter!(AUTH_REHASH).increment(1);
                            info!(user_id = %record.user_id, "credential hash upgraded to current cost");
                        },
                        Err(e) => warn!(user_id = %record.user_id, error = %e, "credential hash upgrade failed"),
                    }
                }
                record
            },
            _ => {
                self.limiter.record_failed_attempt(client);
                counter!(AUTH_LOGIN_FAILURE, "reason" => "credentials").increment(1);
                info!(client, "login rejected");
                return Err(AppError::InvalidCredentials);
            },
        };

        self.limiter.record_success(client);
        counter!(AUTH_LOGIN_SUCCESS).increment(1);
        info!(user_id = %record.user_id, role = %record.role, "login succeeded");
        Ok(self.open_session(identity, &record.user_id.to_string(), record.role, now))
    }
}
