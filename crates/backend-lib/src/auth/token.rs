// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed, self-contained session tokens.
//!
//! Wire format: `<kid>.<payload>.<signature>`, where `payload` is the
//! base64url JSON claim and `signature` is base64url HMAC-SHA256 over
//! `<kid>.<payload>` under the key named by `kid`. Nothing is stored
//! server-side; a token is valid while its signature verifies under a
//! configured key and its expiry lies in the future.
use std::collections::HashMap;

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use warden_common::{Role, SessionView};

use crate::config::{ConfigError, SessionSettings};

type HmacSha256 = Hmac<Sha256>;

/// Minimum amount of key material accepted for signing or verification
pub const MIN_KEY_BYTES: usize = 32;

/// Authenticated assertion about a requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaim {
    /// Opaque user id
    pub sub: String,
    pub role: Role,
    pub iat: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

impl SessionClaim {
    pub fn view(&self) -> SessionView {
        SessionView {
            user_id: self.sub.clone(),
            role: self.role,
            expires_at: self.exp,
        }
    }
}

/// Why a presented token was rejected
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

/// Process-wide keyring: one signing key plus verification-only keys.
///
/// Built once at startup and shared read-only; rotating means starting with
/// the new key as `signing_key` and the old one under `verification_keys`.
#[derive(Clone)]
pub struct SessionTokens {
    active_kid: String,
    keys: HashMap<String, HmacSha256>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kids: Vec<&String> = self.keys.keys().collect();
        kids.sort();
        f.debug_struct("SessionTokens")
            .field("active_kid", &self.active_kid)
            .field("kids", &kids)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionTokens {
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, ConfigError> {
        let signing = settings
            .signing_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSigningKey)?;
        let ttl = i64::try_from(settings.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ConfigError::Invalid("session.ttl_secs out of range".into()))?;

        let mut tokens = Self::new(&settings.signing_kid, signing.as_bytes(), ttl)?;
        for extra in &settings.verification_keys {
            tokens.add_verification_key(&extra.kid, extra.key.as_bytes())?;
        }
        Ok(tokens)
    }

    /// Keyring with a single signing key; `material` is base64 or raw bytes
    pub fn new(kid: &str, material: &[u8], ttl: Duration) -> Result<Self, ConfigError> {
        if ttl <= Duration::zero() {
            return Err(ConfigError::Invalid("session ttl must be positive".into()));
        }
        let mut tokens = Self {
            active_kid: kid.to_string(),
            keys: HashMap::new(),
            ttl,
        };
        tokens.add_verification_key(kid, material)?;
        Ok(tokens)
    }

    fn add_verification_key(&mut self, kid: &str, material: &[u8]) -> Result<(), ConfigError> {
        validate_kid(kid)?;
        if self.keys.contains_key(kid) {
            return Err(ConfigError::DuplicateKeyId(kid.to_string()));
        }
        let key = parse_key_material(kid, material)?;
        let mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| ConfigError::Invalid(format!("key '{kid}': {e}")))?;
        self.keys.insert(kid.to_string(), mac);
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn active_kid(&self) -> &str {
        &self.active_kid
    }

    /// Mint a token for `sub` valid until `now + ttl`
    pub fn issue(&self, sub: &str, role: Role, now: DateTime<Utc>) -> (String, SessionClaim) {
        let claim = SessionClaim {
            sub: sub.to_string(),
            role,
            iat: now,
            exp: now + self.ttl,
        };
        // strings, an enum and timestamps: to_vec has no failure path here
        let json = serde_json::to_vec(&claim).expect("session claim serializes to JSON");
        let signed = format!("{}.{}", self.active_kid, URL_SAFE_NO_PAD.encode(json));
        let signature = self.sign(&self.active_kid, signed.as_bytes());
        (format!("{signed}.{signature}"), claim)
    }

    /// Check structure, signature and expiry, in that order
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaim, TokenError> {
        let mut parts = token.split('.');
        let (Some(kid), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if kid.is_empty() || payload.is_empty() || signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        let mac = self.keys.get(kid).ok_or(TokenError::InvalidSignature)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;
        let signed_len = kid.len() + 1 + payload.len();
        let mut mac = mac.clone();
        mac.update(&token.as_bytes()[..signed_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claim: SessionClaim =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if claim.exp <= claim.iat {
            return Err(TokenError::Malformed);
        }
        if now >= claim.exp {
            return Err(TokenError::Expired);
        }
        Ok(claim)
    }

    fn sign(&self, kid: &str, data: &[u8]) -> String {
        let mut mac = self.keys[kid].clone();
        mac.update(data);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

fn validate_kid(kid: &str) -> Result<(), ConfigError> {
    let ok = !kid.is_empty()
        && kid.len() <= 32
        && kid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidKeyId(kid.to_string()))
    }
}

/// Accept base64url, standard base64 or raw key material of at least 32 bytes
fn parse_key_material(kid: &str, raw: &[u8]) -> Result<Vec<u8>, ConfigError> {
    let trimmed = std::str::from_utf8(raw).map(str::trim).unwrap_or_default();
    for engine in [&URL_SAFE_NO_PAD, &STANDARD] {
        if let Ok(bytes) = engine.decode(trimmed) {
            if bytes.len() >= MIN_KEY_BYTES {
                return Ok(bytes);
            }
        }
    }
    if raw.len() >= MIN_KEY_BYTES {
        return Ok(raw.to_vec());
    }
    Err(ConfigError::WeakSigningKey {
        kid: kid.to_string(),
        min: MIN_KEY_BYTES,
    })
}
