// ============================
// crates/backend-lib/src/auth/directory.rs
// ============================
//! Credential directory backing registration and login.
//!
//! Only what authentication needs: identity, stored hash, role. Richer
//! account data belongs to the host application.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use thiserror::Error;
use uuid::Uuid;
use warden_common::{Role, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub identity: String,
    pub hash: String,
    pub role: Role,
}

impl CredentialRecord {
    pub fn new(identity: &str, hash: String, role: Role) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            identity: identity.to_string(),
            hash,
            role,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("identity '{0}' already exists")]
    Conflict(String),

    #[error("identity '{0}' not found")]
    NotFound(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert(&self, record: CredentialRecord) -> Result<(), DirectoryError>;
    async fn find(&self, identity: &str) -> Option<CredentialRecord>;
    async fn replace_hash(&self, identity: &str, hash: String) -> Result<(), DirectoryError>;
}

/// Process-local directory; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: DashMap<String, CredentialRecord>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, record: CredentialRecord) -> Result<(), DirectoryError> {
        match self.records.entry(record.identity.clone()) {
            Entry::Occupied(_) => Err(DirectoryError::Conflict(record.identity)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            },
        }
    }

    async fn find(&self, identity: &str) -> Option<CredentialRecord> {
        self.records.get(identity).map(|r| r.value().clone())
    }

    async fn replace_hash(&self, identity: &str, hash: String) -> Result<(), DirectoryError> {
        let mut record = self
            .records
            .get_mut(identity)
            .ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
        record.hash = hash;
        Ok(())
    }
}
