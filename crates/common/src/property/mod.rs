use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyStoreError {
    #[error("property store error: {0}")]
    Internal(String),
}

/// Contract for the per-actor property bag, keyed by (actor id, name).
#[async_trait]
pub trait PropertyStore: Send + Sync + 'static {
    async fn get(&self, actor_id: &str, name: &str) -> Result<Option<String>, PropertyStoreError>;

    async fn set(
        &self,
        actor_id: &str,
        name: &str,
        value: &str,
    ) -> Result<(), PropertyStoreError>;

    /// Remove one property. Returns false if it did not exist.
    async fn delete(&self, actor_id: &str, name: &str) -> Result<bool, PropertyStoreError>;

    /// Remove every property owned by an actor (cascade deletion).
    async fn delete_all(&self, actor_id: &str) -> Result<(), PropertyStoreError>;
}

/// In-memory property store using nested HashMaps
#[derive(Debug, Clone, Default)]
pub struct MemoryPropertyStore {
    inner: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err(e: impl std::fmt::Display) -> PropertyStoreError {
        PropertyStoreError::Internal(format!("failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn get(&self, actor_id: &str, name: &str) -> Result<Option<String>, PropertyStoreError> {
        let inner = self.inner.read().map_err(Self::lock_err)?;
        Ok(inner
            .get(actor_id)
            .and_then(|props| props.get(name))
            .cloned())
    }

    async fn set(
        &self,
        actor_id: &str,
        name: &str,
        value: &str,
    ) -> Result<(), PropertyStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        inner
            .entry(actor_id.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, actor_id: &str, name: &str) -> Result<bool, PropertyStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        Ok(inner
            .get_mut(actor_id)
            .map(|props| props.remove(name).is_some())
            .unwrap_or(false))
    }

    async fn delete_all(&self, actor_id: &str) -> Result<(), PropertyStoreError> {
        let mut inner = self.inner.write().map_err(Self::lock_err)?;
        inner.remove(actor_id);
        Ok(())
    }
}
