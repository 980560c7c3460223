use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{TrustFilter, TrustRelationship};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustStoreError {
    /// a row for this (actor, peer) pair already exists
    #[error("trust relationship already exists for peer {0}")]
    AlreadyExists(String),
    /// another relationship of the same actor already uses this secret
    #[error("secret collides with an existing trust relationship")]
    SecretCollision,
    #[error("trust store error: {0}")]
    Internal(String),
}

/// Contract for the trust relationship store.
///
/// Backed by a key-value store keyed on `(actor_id, peer_id)` with a
/// secondary lookup on the shared secret and filtered scans per actor.
/// No side effects beyond the store itself.
#[async_trait]
pub trait TrustStore: Send + Sync + 'static {
    async fn get(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> Result<Option<TrustRelationship>, TrustStoreError>;

    /// Resolve an inbound bearer token to the relationship it belongs to.
    async fn get_by_secret(
        &self,
        actor_id: &str,
        secret: &str,
    ) -> Result<Option<TrustRelationship>, TrustStoreError>;

    async fn list(
        &self,
        actor_id: &str,
        filter: &TrustFilter,
    ) -> Result<Vec<TrustRelationship>, TrustStoreError>;

    /// Insert a new row. Fails on a duplicate (actor, peer) pair and on a
    /// secret collision within the same actor.
    async fn create(&self, rel: TrustRelationship) -> Result<(), TrustStoreError>;

    /// Full-record rewrite keyed by (actor_id, peer_id). Callers that only
    /// want to change one field must re-read before writing.
    async fn modify(&self, rel: TrustRelationship) -> Result<(), TrustStoreError>;

    /// Remove a row. Returns false if no row existed.
    async fn delete(&self, actor_id: &str, peer_id: &str) -> Result<bool, TrustStoreError>;

    /// Remove every row owned by an actor (cascade deletion).
    async fn delete_all(&self, actor_id: &str) -> Result<(), TrustStoreError>;
}

/// In-memory trust store: per-actor maps of peer id to relationship,
/// plus a secret index for bearer-token resolution
#[derive(Debug, Clone, Default)]
pub struct MemoryTrustStore {
    inner: Arc<RwLock<MemoryTrustStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryTrustStoreInner {
    /// actor_id -> peer_id -> relationship
    rows: HashMap<String, HashMap<String, TrustRelationship>>,
    /// actor_id -> secret -> peer_id
    secrets: HashMap<String, HashMap<String, String>>,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err(e: impl std::fmt::Display) -> TrustStoreError {
        TrustStoreError::Internal(format!("failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl TrustStore for MemoryTrustStore {
    async fn get(
        &self,
        actor_id: &str,
        peer_id: &str,
    ) -> Result<Option<TrustRelationship>, TrustStoreError> {
        let inner = self.inner.read().map_err(Self::lock_err)?;
        Ok(inner
            .rows
            .get(actor_id)
            .and_then(|peers| peers.get(peer_id))
            .cloned())
    }

    async fn get_by_secret(
        &self,
        actor_id: &str,
        secret: &str,
    ) -> Result<Option<TrustRelationship>, TrustStoreError> {
        let inner = self.inner.read().map_err(Self::lock_err)?;
        let peer_id = match inner
            .secrets
            .get(actor_id)
            .and_then(|secrets| secrets.get(secret))
        {
            Some(peer_id) => peer_id,
            None => return Ok(None),
        };
        Ok(inner
            .rows
            .get(actor_id)
            .and_then(|peers| peers.get(peer_id))
            .cloned())
    }

    async fn list(
        &self,
        actor_id: &str,
        filter: &TrustFilter,
    ) -> Result<Vec<TrustRelationship>, TrustStoreError> {
        let inner = self.inner.read().map_err(Self::lock_err)?;
        let mut rows: Vec<_> = inner
            .rows
            .get(actor_id)
            .map(|peers| peers.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));
        Ok(rows)
    }

    async fn create(&self, rel: TrustRelationship) -> Result<(), TrustStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;

        if let Some(peers) = inner.rows.get(&rel.actor_id) {
            if peers.contains_key(&rel.peer_id) {
                return Err(TrustStoreError::AlreadyExists(rel.peer_id));
            }
        }
        if let Some(secrets) = inner.secrets.get(&rel.actor_id) {
            if secrets.contains_key(&rel.secret) {
                return Err(TrustStoreError::SecretCollision);
            }
        }

        inner
            .secrets
            .entry(rel.actor_id.clone())
            .or_default()
            .insert(rel.secret.clone(), rel.peer_id.clone());
        inner
            .rows
            .entry(rel.actor_id.clone())
            .or_default()
            .insert(rel.peer_id.clone(), rel);
        Ok(())
    }

    async fn modify(&self, rel: TrustRelationship) -> Result<(), TrustStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;

        // drop the old secret index entry before rewriting the row
        let old_secret = inner
            .rows
            .get(&rel.actor_id)
            .and_then(|peers| peers.get(&rel.peer_id))
            .map(|old| old.secret.clone());
        if let Some(old_secret) = old_secret {
            if old_secret != rel.secret {
                if let Some(secrets) = inner.secrets.get(&rel.actor_id) {
                    if secrets
                        .get(&rel.secret)
                        .is_some_and(|peer| peer != &rel.peer_id)
                    {
                        return Err(TrustStoreError::SecretCollision);
                    }
                }
                if let Some(secrets) = inner.secrets.get_mut(&rel.actor_id) {
                    secrets.remove(&old_secret);
                }
            }
        }

        inner
            .secrets
            .entry(rel.actor_id.clone())
            .or_default()
            .insert(rel.secret.clone(), rel.peer_id.clone());
        inner
            .rows
            .entry(rel.actor_id.clone())
            .or_default()
            .insert(rel.peer_id.clone(), rel);
        Ok(())
    }

    async fn delete(&self, actor_id: &str, peer_id: &str) -> Result<bool, TrustStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        let removed = inner
            .rows
            .get_mut(actor_id)
            .and_then(|peers| peers.remove(peer_id));
        if let Some(ref rel) = removed {
            if let Some(secrets) = inner.secrets.get_mut(actor_id) {
                secrets.remove(&rel.secret);
            }
        }
        Ok(removed.is_some())
    }

    async fn delete_all(&self, actor_id: &str) -> Result<(), TrustStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        inner.rows.remove(actor_id);
        inner.secrets.remove(actor_id);
        Ok(())
    }
}
