// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Credential hashing, signed session tokens and route gating for `warden`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod policy;
pub mod router;
pub mod telemetry;

use std::sync::Arc;

use crate::auth::{
    AuthRateLimiter, AuthService, CredentialHasher, CredentialStore, DefaultAuth, HashWorkers,
    InMemoryCredentialStore, SessionTokens,
};
use crate::config::{ConfigError, Settings};
use crate::policy::Policy;

/// Application state shared across all handlers.
///
/// Everything here is built once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Registration and login
    pub auth: Arc<dyn AuthService>,
    /// Hasher for new credentials
    pub hasher: Arc<CredentialHasher>,
    /// Pool that runs hashing off the request path
    pub workers: HashWorkers,
    /// Session token keyring
    pub tokens: Arc<SessionTokens>,
    /// Ordered route authorization rules
    pub policy: Arc<Policy>,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
    /// Failed-login lockouts
    pub rate_limiter: AuthRateLimiter,
}

impl AppState {
    /// Create a new application state with an in-memory credential directory
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        Self::with_store(settings, Arc::new(InMemoryCredentialStore::new()))
    }

    /// Create a new application state over the given credential directory.
    ///
    /// Fails when the configuration cannot produce a working service, most
    /// notably when no signing key is configured.
    pub fn with_store(
        settings: Settings,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let tokens = Arc::new(SessionTokens::from_settings(&settings.session)?);
        let policy = Arc::new(Policy::from_settings(&settings.gate.rules)?);
        let hasher = Arc::new(CredentialHasher::new(&settings.hashing)?);
        let workers = HashWorkers::new(settings.hashing.workers);
        let rate_limiter = AuthRateLimiter::from_settings(&settings.rate_limit);

        let auth = DefaultAuth::new(
            Arc::clone(&hasher),
            workers.clone(),
            store,
            Arc::clone(&tokens),
            rate_limiter.clone(),
            &settings.auth.admin_identities,
        )
        .map_err(|e| ConfigError::Invalid(format!("credential hasher self-test: {e}")))?;

        tracing::info!(
            cost = hasher.cost(),
            workers = workers.size(),
            rules = policy.rules().len(),
            signing_kid = tokens.active_kid(),
            "authentication initialized"
        );

        Ok(Self {
            auth: Arc::new(auth),
            hasher,
            workers,
            tokens,
            policy,
            settings: Arc::new(settings),
            rate_limiter,
        })
    }
}
