//! Lease-guarded read-modify-write over the state object.
//!
//! Per request the sequence is acquire, mutate, release. Release runs on
//! every path that acquired, including mutation errors; the store is never
//! asked for a write precondition because the lease is the mutual exclusion.

use std::sync::Arc;

use bytes::Bytes;
use snafu::Snafu;
use uuid::Uuid;

use crate::error::IncrementError;
use crate::lock::LeaseLock;
use crate::lock::LockError;
use crate::state::apply_increment;
use crate::state::SwitcherState;
use crate::state::SOURCE_NAME;
use crate::store::ObjectStore;

/// Errors from the read-modify-write cycle.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StateError {
    /// The state object is missing or not valid JSON.
    #[snafu(display("failed to read state at '{location}': {reason}"))]
    Read {
        /// The state object location.
        location: String,
        /// What went wrong.
        reason: String,
    },

    /// The updated state could not be written back.
    #[snafu(display("failed to write state at '{location}': {reason}"))]
    Write {
        /// The state object location.
        location: String,
        /// What went wrong.
        reason: String,
    },
}

/// Fetch the state blob, apply `mutate`, and write the result back.
///
/// The write overwrites unconditionally: callers must hold the lease, which
/// is what prevents concurrent writers. Both error variants leave the caller
/// responsible for releasing that lease.
pub async fn read_modify_write<S, F>(store: &S, location: &str, mutate: F) -> Result<SwitcherState, StateError>
where
    S: ObjectStore + ?Sized,
    F: FnOnce(SwitcherState) -> SwitcherState,
{
    let blob = store.get(location).await.map_err(|e| StateError::Read {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    let state: SwitcherState = serde_json::from_slice(&blob).map_err(|e| StateError::Read {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    let updated = mutate(state);

    let payload = serde_json::to_vec(&updated).map_err(|e| StateError::Write {
        location: location.to_string(),
        reason: e.to_string(),
    })?;
    store.put(location, Bytes::from(payload)).await.map_err(|e| StateError::Write {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    Ok(updated)
}

/// One full increment cycle: acquire the lease, apply the increment
/// mutation to the state object, release the lease.
///
/// The owner identifier is unique per acquisition. Contention surfaces as
/// [`IncrementError::LockContention`]; every other lock failure is a backend
/// error and is not retried.
pub async fn increment_cycle<S: ObjectStore + ?Sized>(
    store: Arc<S>,
    state_location: &str,
    lock: &LeaseLock<S>,
) -> Result<SwitcherState, IncrementError> {
    let owner = format!("{}-{}", SOURCE_NAME, Uuid::new_v4());

    match lock.acquire(&owner).await {
        Ok(()) => {}
        Err(LockError::Contended { attempts, .. }) => {
            return Err(IncrementError::LockContention { attempts });
        }
        Err(e) => {
            return Err(IncrementError::Backend { reason: e.to_string() });
        }
    }

    // Lease is held from here; release on every exit.
    let result = read_modify_write(store.as_ref(), state_location, apply_increment).await;
    lock.release().await;

    result.map_err(|e| match e {
        read @ StateError::Read { .. } => IncrementError::StateRead { source: read },
        write @ StateError::Write { .. } => IncrementError::StateWrite { source: write },
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::lock::RetryPolicy;
    use crate::state::Actor;
    use crate::store::InMemoryObjectStore;
    use crate::store::ObjectStoreError;

    const STATE: &str = "switcher.json";
    const LOCK: &str = "increment.lock";

    fn fast_lock<S: ObjectStore + ?Sized>(store: Arc<S>, attempts: u32) -> LeaseLock<S> {
        LeaseLock::new(
            store,
            LOCK,
            Duration::from_secs(30),
            RetryPolicy {
                max_attempts: attempts,
                retry_delay: Duration::from_millis(1),
                jitter: Duration::ZERO,
            },
        )
    }

    async fn seed(store: &InMemoryObjectStore, json: &str) {
        store.put(STATE, Bytes::from(json.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_modify_write_applies_mutation() {
        let store = InMemoryObjectStore::new();
        seed(&store, r#"{"counter":5,"next_actor":"vm"}"#).await;

        let updated = read_modify_write(store.as_ref(), STATE, apply_increment).await.unwrap();
        assert_eq!(updated.counter, 6);
        assert_eq!(updated.next_actor, Actor::Faas);

        let persisted: SwitcherState = serde_json::from_slice(&store.peek(STATE).await.unwrap()).unwrap();
        assert_eq!(persisted, updated);
    }

    #[tokio::test]
    async fn test_missing_state_is_read_error() {
        let store = InMemoryObjectStore::new();
        let err = read_modify_write(store.as_ref(), STATE, apply_increment).await.unwrap_err();
        assert!(matches!(err, StateError::Read { .. }));
    }

    #[tokio::test]
    async fn test_malformed_state_is_read_error() {
        let store = InMemoryObjectStore::new();
        seed(&store, "not json").await;

        let err = read_modify_write(store.as_ref(), STATE, apply_increment).await.unwrap_err();
        assert!(matches!(err, StateError::Read { .. }));
    }

    #[tokio::test]
    async fn test_increment_cycle_releases_lease_on_success() {
        let store = InMemoryObjectStore::new();
        seed(&store, r#"{"counter":0,"next_actor":"vm"}"#).await;

        let lock = fast_lock(store.clone(), 3);
        let updated = increment_cycle(store.clone(), STATE, &lock).await.unwrap();

        assert_eq!(updated.counter, 1);
        assert!(store.peek(LOCK).await.is_none(), "lease must be gone after success");
    }

    #[tokio::test]
    async fn test_contended_cycle_leaves_state_untouched() {
        let store = InMemoryObjectStore::new();
        seed(&store, r#"{"counter":3,"next_actor":"faas"}"#).await;
        store
            .create_if_absent(LOCK, Bytes::from_static(b"{\"owner\":\"other\",\"expires_at\":0}"))
            .await
            .unwrap();

        let before = store.peek(STATE).await.unwrap();
        let lock = fast_lock(store.clone(), 2);
        let err = increment_cycle(store.clone(), STATE, &lock).await.unwrap_err();

        assert!(matches!(err, IncrementError::LockContention { attempts: 2 }));
        assert_eq!(store.peek(STATE).await.unwrap(), before, "state must be byte-for-byte unchanged");
    }

    /// Store that delegates everything to an inner in-memory store but fails
    /// writes to one location.
    struct WriteFailingStore {
        inner: Arc<InMemoryObjectStore>,
        failing_location: String,
    }

    #[async_trait]
    impl ObjectStore for WriteFailingStore {
        async fn get(&self, location: &str) -> Result<Bytes, ObjectStoreError> {
            self.inner.get(location).await
        }

        async fn put(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
            if location == self.failing_location {
                return Err(ObjectStoreError::Backend {
                    location: location.to_string(),
                    reason: "simulated write outage".to_string(),
                });
            }
            self.inner.put(location, payload).await
        }

        async fn create_if_absent(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError> {
            self.inner.create_if_absent(location, payload).await
        }

        async fn delete(&self, location: &str) -> Result<(), ObjectStoreError> {
            self.inner.delete(location).await
        }
    }

    #[tokio::test]
    async fn test_failed_mutation_still_releases_lease() {
        let inner = InMemoryObjectStore::new();
        seed(&inner, r#"{"counter":0,"next_actor":"vm"}"#).await;

        let store: Arc<dyn ObjectStore> = Arc::new(WriteFailingStore {
            inner: inner.clone(),
            failing_location: STATE.to_string(),
        });

        let lock = fast_lock(store.clone(), 3);
        let err = increment_cycle(store.clone(), STATE, &lock).await.unwrap_err();
        assert!(matches!(err, IncrementError::StateWrite { .. }));

        // Observable release: a different caller acquires immediately.
        assert!(inner.peek(LOCK).await.is_none());
        let second = fast_lock(store, 1);
        second.acquire("other-caller").await.unwrap();
    }
}
