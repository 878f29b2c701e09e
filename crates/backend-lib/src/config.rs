// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_common::Role;

use crate::auth::password::{scrypt_within_limits, MAX_SCRYPT_LOG_N};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

/// Prefix of environment overrides, e.g. `WARDEN_SESSION__TTL_SECS`
pub const ENV_PREFIX: &str = "WARDEN_";

/// Configuration problems. All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no session signing key configured")]
    MissingSigningKey,

    #[error("signing key '{kid}' is shorter than {min} bytes")]
    WeakSigningKey { kid: String, min: usize },

    #[error("invalid key id '{0}'")]
    InvalidKeyId(String),

    #[error("duplicate key id '{0}'")]
    DuplicateKeyId(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub hashing: HashingSettings,
    pub session: SessionSettings,
    pub gate: GateSettings,
    pub rate_limit: RateLimitSettings,
    pub auth: AuthSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Key login lockouts by `x-real-ip`/`x-forwarded-for` instead of the
    /// peer address. Only safe behind a reverse proxy that overwrites them.
    pub trust_forwarded_headers: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            trust_forwarded_headers: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// scrypt cost parameters and the size of the hashing pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    /// log2 of the scrypt CPU/memory cost `N`
    pub log_n: u8,
    /// scrypt block size
    pub r: u32,
    /// scrypt parallelism
    pub p: u32,
    /// Maximum number of concurrent hash/verify jobs; 0 = available parallelism
    pub workers: usize,
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
            workers: 0,
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ttl_secs: u64,
    pub cookie_name: String,
    pub secure_cookie: bool,
    /// Key material of the active signing key (base64 or raw, >= 32 bytes)
    pub signing_key: Option<String>,
    pub signing_kid: String,
    /// Additional keys accepted for verification only
    pub verification_keys: Vec<KeySettings>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60 * 24, // 24 hours
            cookie_name: "warden_session".to_string(),
            secure_cookie: false,
            signing_key: None,
            signing_kid: "k1".to_string(),
            verification_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeySettings {
    pub kid: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequireKind {
    Public,
    Authenticated,
    Roles,
}

/// One `[[gate.rules]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSettings {
    pub pattern: String,
    pub require: RequireKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

impl RuleSettings {
    pub fn new(pattern: &str, require: RequireKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            require,
            roles: Vec::new(),
        }
    }

    pub fn roles(pattern: &str, roles: &[Role]) -> Self {
        Self {
            pattern: pattern.to_string(),
            require: RequireKind::Roles,
            roles: roles.to_vec(),
        }
    }
}

/// Route authorization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Ordered rules; the first matching pattern governs the request
    pub rules: Vec<RuleSettings>,
    /// Where browsers are sent when access is denied; `None` answers 401/403
    pub login_redirect: Option<String>,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            rules: vec![
                RuleSettings::new("/api/session", RequireKind::Authenticated),
                RuleSettings::roles("/admin/*", &[Role::Admin]),
                RuleSettings::new("/dashboard/*", RequireKind::Authenticated),
                RuleSettings::new("*", RequireKind::Public),
            ],
            login_redirect: None,
        }
    }
}

/// Failed-login lockout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_attempts: u32,
    pub lockout_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// Identities that receive the `admin` role when they register
    pub admin_identities: Vec<String>,
}

impl Settings {
    /// Layered configuration: defaults, then the TOML file, then `WARDEN_*` env vars.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate settings
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path)
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that cannot produce a working service
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host is empty".into()));
        }
        if self.hashing.log_n < 10 || self.hashing.log_n > MAX_SCRYPT_LOG_N {
            return Err(ConfigError::Invalid(format!(
                "hashing.log_n must be within 10..={MAX_SCRYPT_LOG_N}, got {}",
                self.hashing.log_n
            )));
        }
        if self.hashing.r == 0 || self.hashing.p == 0 {
            return Err(ConfigError::Invalid("hashing.r and hashing.p must be positive".into()));
        }
        // the server must be able to verify its own hashes
        if !scrypt_within_limits(self.hashing.log_n, self.hashing.r, self.hashing.p) {
            return Err(ConfigError::Invalid(format!(
                "hashing cost log_n={}, r={}, p={} exceeds the verification ceiling",
                self.hashing.log_n, self.hashing.r, self.hashing.p
            )));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::Invalid("session.ttl_secs must be positive".into()));
        }
        if self.session.cookie_name.is_empty()
            || !self
                .session
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "session.cookie_name '{}' is not a valid cookie name",
                self.session.cookie_name
            )));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid("rate_limit.max_attempts must be positive".into()));
        }
        for rule in &self.gate.rules {
            if rule.pattern.is_empty() {
                return Err(ConfigError::Invalid("gate rule with empty pattern".into()));
            }
            if rule.require == RequireKind::Roles && rule.roles.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "gate rule '{}' requires roles but lists none",
                    rule.pattern
                )));
            }
        }
        if let Some(redirect) = &self.gate.login_redirect {
            if !redirect.starts_with('/') {
                return Err(ConfigError::Invalid(
                    "gate.login_redirect must be an absolute path".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
