// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are PHC strings (`$scrypt$ln=15,r=8,p=1$<salt>$<digest>`), so every
//! stored hash carries the algorithm and cost it was made with. Raising the
//! configured cost never invalidates older hashes; [`CredentialHasher::needs_rehash`]
//! reports which ones should be upgraded on the next successful login.
use argon2::Argon2;
use password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use scrypt::{Params, Scrypt};
use thiserror::Error;
use tracing::warn;

use crate::config::{ConfigError, HashingSettings};

/// PHC identifier of the algorithm new hashes are made with
pub const CURRENT_ALGORITHM: &str = "scrypt";

/// Ceilings on the cost a hash may ask [`CredentialHasher::verify`] to pay.
/// Hashes submitted for verification are untrusted, and their parameters
/// decide how much memory and CPU the recomputation takes.
pub const MAX_SCRYPT_LOG_N: u8 = 20;
/// Bytes of scrypt working memory, `128 * r * 2^log_n`
pub const MAX_SCRYPT_MEMORY: u64 = 1 << 30;
pub const MAX_SCRYPT_P: u32 = 16;
/// KiB of argon2 working memory
pub const MAX_ARGON2_M_COST: u32 = 1 << 20;
pub const MAX_ARGON2_T_COST: u32 = 16;
pub const MAX_ARGON2_P_COST: u32 = 16;

/// Whether scrypt parameters stay under the verification ceilings
pub fn scrypt_within_limits(log_n: u8, r: u32, p: u32) -> bool {
    log_n <= MAX_SCRYPT_LOG_N
        && p <= MAX_SCRYPT_P
        && (128 * u64::from(r)) << log_n <= MAX_SCRYPT_MEMORY
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("secret must be non-empty")]
    InvalidInput,

    #[error("stored hash cannot be parsed")]
    MalformedHash,

    #[error("hashing failed: {0}")]
    Hashing(String),

    #[error("hashing worker failed: {0}")]
    Worker(String),
}

/// Outcome of a verification that may also upgrade the stored hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Mismatch,
    /// `upgraded` holds a fresh hash when the stored one used weaker parameters
    Match { upgraded: Option<String> },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match { .. })
    }
}

/// One-way credential hasher with a fixed cost for new hashes
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(settings: &HashingSettings) -> Result<Self, ConfigError> {
        let params = Params::new(settings.log_n, settings.r, settings.p, Params::RECOMMENDED_LEN)
            .map_err(|e| ConfigError::Invalid(format!("scrypt parameters: {e}")))?;
        Ok(Self { params })
    }

    /// log2(N) used for new hashes
    pub fn cost(&self) -> u8 {
        self.params.log_n()
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        if plain.is_empty() {
            return Err(PasswordError::InvalidInput);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// A wrong password is `Ok(false)`. An unparseable hash, or one whose
    /// cost exceeds the verification ceilings, is `MalformedHash` and is
    /// rejected before any digest work. Digest comparison is constant-time.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        if plain.is_empty() {
            return Err(PasswordError::InvalidInput);
        }
        let parsed = parse(hash)?;
        let outcome = match parsed.algorithm.as_str() {
            "scrypt" => {
                check_scrypt_cost(&parsed)?;
                Scrypt.verify_password(plain.as_bytes(), &parsed)
            },
            "argon2id" | "argon2i" | "argon2d" => {
                check_argon2_cost(&parsed)?;
                Argon2::default().verify_password(plain.as_bytes(), &parsed)
            },
            _ => return Err(PasswordError::MalformedHash),
        };
        match outcome {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::MalformedHash),
        }
    }

    /// Whether a stored hash was made with another algorithm or a lower cost
    pub fn needs_rehash(&self, hash: &str) -> Result<bool, PasswordError> {
        let parsed = parse(hash)?;
        if parsed.algorithm.as_str() != CURRENT_ALGORITHM {
            return Ok(true);
        }
        let stored = Params::try_from(&parsed).map_err(|_| PasswordError::MalformedHash)?;
        Ok(stored.log_n() < self.params.log_n()
            || stored.r() < self.params.r()
            || stored.p() < self.params.p())
    }

    /// Verify and, on success, rehash with the current parameters if needed
    pub fn verify_and_upgrade(&self, plain: &str, hash: &str) -> Result<Verification, PasswordError> {
        if !self.verify(plain, hash)? {
            return Ok(Verification::Mismatch);
        }
        let upgraded = if self.needs_rehash(hash)? {
            Some(self.hash(plain)?)
        } else {
            None
        };
        Ok(Verification::Match { upgraded })
    }
}

fn parse(hash: &str) -> Result<PasswordHash<'_>, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::MalformedHash)?;
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(PasswordError::MalformedHash);
    }
    Ok(parsed)
}

fn check_scrypt_cost(parsed: &PasswordHash<'_>) -> Result<(), PasswordError> {
    let params = Params::try_from(parsed).map_err(|_| PasswordError::MalformedHash)?;
    if !scrypt_within_limits(params.log_n(), params.r(), params.p()) {
        warn!(
            log_n = params.log_n(),
            r = params.r(),
            p = params.p(),
            "refusing to verify scrypt hash above cost ceiling"
        );
        return Err(PasswordError::MalformedHash);
    }
    Ok(())
}

fn check_argon2_cost(parsed: &PasswordHash<'_>) -> Result<(), PasswordError> {
    let params = argon2::Params::try_from(parsed).map_err(|_| PasswordError::MalformedHash)?;
    if params.m_cost() > MAX_ARGON2_M_COST
        || params.t_cost() > MAX_ARGON2_T_COST
        || params.p_cost() > MAX_ARGON2_P_COST
    {
        warn!(
            m_cost = params.m_cost(),
            t_cost = params.t_cost(),
            p_cost = params.p_cost(),
            "refusing to verify argon2 hash above cost ceiling"
        );
        return Err(PasswordError::MalformedHash);
    }
    Ok(())
}
