use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::Actor;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorStoreError {
    #[error("actor already exists: {0}")]
    AlreadyExists(String),
    #[error("actor store error: {0}")]
    Internal(String),
}

/// Contract for the actor identity store.
///
/// Backed by a key-value store with point lookups on the actor id;
/// implementations must provide atomic point writes per record.
#[async_trait]
pub trait ActorStore: Send + Sync + 'static {
    async fn get(&self, id: &str) -> Result<Option<Actor>, ActorStoreError>;

    async fn create(&self, actor: Actor) -> Result<(), ActorStoreError>;

    /// Full-record rewrite keyed by the actor id.
    async fn modify(&self, actor: Actor) -> Result<(), ActorStoreError>;

    /// Remove the actor row. Returns false if no row existed.
    async fn delete(&self, id: &str) -> Result<bool, ActorStoreError>;
}

/// In-memory actor store using a HashMap keyed by actor id
#[derive(Debug, Clone, Default)]
pub struct MemoryActorStore {
    inner: Arc<RwLock<HashMap<String, Actor>>>,
}

impl MemoryActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err(e: impl std::fmt::Display) -> ActorStoreError {
        ActorStoreError::Internal(format!("failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl ActorStore for MemoryActorStore {
    async fn get(&self, id: &str) -> Result<Option<Actor>, ActorStoreError> {
        let inner = self.inner.read().map_err(Self::lock_err)?;
        Ok(inner.get(id).cloned())
    }

    async fn create(&self, actor: Actor) -> Result<(), ActorStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        if inner.contains_key(&actor.id) {
            return Err(ActorStoreError::AlreadyExists(actor.id));
        }
        inner.insert(actor.id.clone(), actor);
        Ok(())
    }

    async fn modify(&self, actor: Actor) -> Result<(), ActorStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        inner.insert(actor.id.clone(), actor);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, ActorStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        Ok(inner.remove(id).is_some())
    }
}
