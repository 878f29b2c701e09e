// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting for authentication attempts.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RateLimitSettings;

/// Failed attempts are forgotten after a day without new failures
const ENTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires, if locked out
    lockout_expiry: Option<Instant>,
}

/// Rate limiter for authentication attempts, keyed by client address
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<String, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Record a failed authentication attempt
    pub fn record_failed_attempt(&self, client: &str) {
        let now = Instant::now();

        let mut entry = self
            .attempts
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // An expired lockout starts a fresh window
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            tracing::warn!(
                client,
                attempts = entry.failed_attempts,
                lockout_secs = self.lockout_duration.as_secs(),
                "client locked out after repeated authentication failures"
            );
        }
    }

    /// Record a successful authentication
    pub fn record_success(&self, client: &str) {
        self.attempts.remove(client);
    }

    /// Check if a client is allowed to attempt authentication
    pub fn check_rate_limit(&self, client: &str) -> bool {
        match self.attempts.get(client) {
            Some(entry) => match entry.lockout_expiry {
                Some(expiry) => Instant::now() >= expiry,
                None => true,
            },
            None => true,
        }
    }

    /// Clean up expired lockouts and stale entries
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| {
            if let Some(expiry) = entry.lockout_expiry {
                return now < expiry;
            }
            now.duration_since(entry.last_failure) < ENTRY_RETENTION
        });
    }

    /// Periodically run [`cleanup`](Self::cleanup) until the runtime shuts down
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                limiter.cleanup();
            }
        })
    }

    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}
