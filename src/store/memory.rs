//! In-memory object store for tests and local runs.
//!
//! Mirrors the behavior of the production backend without network I/O:
//! create-if-absent is atomic under the store mutex, exactly like the
//! conditional create the real store provides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::ObjectStore;
use super::ObjectStoreError;

/// Deterministic, non-persistent [`ObjectStore`] backed by a map.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl InMemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the object at `location`, if any.
    ///
    /// Test helper; bypasses the [`ObjectStore`] error mapping.
    pub async fn peek(&self, location: &str) -> Option<Bytes> {
        self.objects.lock().await.get(location).cloned()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, location: &str) -> Result<Bytes, ObjectStoreError> {
        self.objects
            .lock()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound {
                location: location.to_string(),
            })
    }

    async fn put(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
        self.objects.lock().await.insert(location.to_string(), payload);
        Ok(())
    }

    async fn create_if_absent(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
        let mut guard = self.objects.lock().await;
        if guard.contains_key(location) {
            return Err(ObjectStoreError::AlreadyExists {
                location: location.to_string(),
            });
        }
        guard.insert(location.to_string(), payload);
        Ok(())
    }

    async fn delete(&self, location: &str) -> Result<(), ObjectStoreError> {
        match self.objects.lock().await.remove(location) {
            Some(_) => Ok(()),
            None => Err(ObjectStoreError::NotFound {
                location: location.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let store = InMemoryObjectStore::new();
        store.put("a.json", Bytes::from_static(b"{}")).await.unwrap();
        assert_eq!(store.get("a.json").await.unwrap(), Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_if_absent_conflicts_on_existing() {
        let store = InMemoryObjectStore::new();
        store.create_if_absent("l", Bytes::from_static(b"1")).await.unwrap();

        let err = store.create_if_absent("l", Bytes::from_static(b"2")).await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::AlreadyExists { .. }));
        // Loser's payload must not clobber the winner's.
        assert_eq!(store.get("l").await.unwrap(), Bytes::from_static(b"1"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        store.put("l", Bytes::from_static(b"x")).await.unwrap();
        store.delete("l").await.unwrap();

        let err = store.delete("l").await.unwrap_err();
        assert!(matches!(err, ObjectStoreError::NotFound { .. }));
    }
}
