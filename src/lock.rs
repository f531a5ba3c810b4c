//! Advisory lease lock over object storage.
//!
//! Mutual exclusion across independent process instances, built on the
//! store's create-if-absent primitive: the lease object existing means the
//! lock is held. The lease records an expiry timestamp as a crash-recovery
//! staleness bound; expired leases are left for out-of-band cleanup rather
//! than reclaimed here.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use snafu::Snafu;
use tracing::debug;
use tracing::warn;

use crate::store::ObjectStore;
use crate::store::ObjectStoreError;

/// Lease record stored at the lock location.
///
/// Created only through the store's conditional create and destroyed by
/// deletion at release; never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    /// Opaque holder identifier, unique per acquisition.
    pub owner: String,
    /// Unix-seconds staleness bound. Advisory: read by no component here.
    pub expires_at: i64,
}

/// Retry policy for lease acquisition.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of conditional-create attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Upper bound on random jitter added to each delay. Zero disables it.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(100),
            jitter: Duration::ZERO,
        }
    }
}

/// Errors from lease acquisition.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LockError {
    /// Every attempt found the lease already held.
    ///
    /// Expected under contention; not a backend failure.
    #[snafu(display("lease at '{location}' still held after {attempts} attempts"))]
    Contended {
        /// The lease object location.
        location: String,
        /// How many attempts were made.
        attempts: u32,
    },

    /// The store failed for a reason other than the lease existing.
    ///
    /// Never retried: backend unavailability must not be mistaken for
    /// contention.
    #[snafu(display("lease acquisition failed: {source}"))]
    Backend {
        /// The underlying store error.
        source: ObjectStoreError,
    },

    /// The lease record could not be serialized.
    #[snafu(display("lease serialization failed: {source}"))]
    Serialization {
        /// The underlying error.
        source: serde_json::Error,
    },
}

/// Handle for one lock location on one store.
///
/// Acquisition and release are explicit; holders are expected to keep the
/// lease for no longer than a single read-modify-write cycle.
pub struct LeaseLock<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    location: String,
    ttl: Duration,
    policy: RetryPolicy,
}

impl<S: ObjectStore + ?Sized> LeaseLock<S> {
    /// Create a new lock handle.
    ///
    /// # Arguments
    /// * `store` - The backing object store
    /// * `location` - Where the lease object lives
    /// * `ttl` - Staleness bound recorded in each lease
    /// * `policy` - Retry behavior for contended acquisitions
    pub fn new(store: Arc<S>, location: impl Into<String>, ttl: Duration, policy: RetryPolicy) -> Self {
        Self {
            store,
            location: location.into(),
            ttl,
            policy,
        }
    }

    /// Attempt to acquire the lease for `owner`.
    ///
    /// Tries the conditional create up to `max_attempts` times, sleeping
    /// between attempts. A conflict counts as a failed attempt; any other
    /// store error aborts acquisition immediately.
    pub async fn acquire(&self, owner: &str) -> Result<(), LockError> {
        for attempt in 1..=self.policy.max_attempts {
            let lease = Lease {
                owner: owner.to_string(),
                expires_at: Utc::now().timestamp() + self.ttl.as_secs() as i64,
            };
            let payload = serde_json::to_vec(&lease).context(SerializationSnafu)?;

            match self.store.create_if_absent(&self.location, Bytes::from(payload)).await {
                Ok(()) => {
                    debug!(location = %self.location, owner, attempt, "lease acquired");
                    return Ok(());
                }
                Err(ObjectStoreError::AlreadyExists { .. }) => {
                    debug!(location = %self.location, owner, attempt, "lease held, backing off");
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.sleep_interval()).await;
                    }
                }
                Err(source) => return Err(LockError::Backend { source }),
            }
        }

        ContendedSnafu {
            location: self.location.clone(),
            attempts: self.policy.max_attempts,
        }
        .fail()
    }

    /// Best-effort release: delete the lease object.
    ///
    /// Failures are logged and swallowed; they must not mask the outcome of
    /// the guarded work. A missing lease is not a correctness violation, the
    /// next acquirer simply recreates it.
    pub async fn release(&self) {
        match self.store.delete(&self.location).await {
            Ok(()) => debug!(location = %self.location, "lease released"),
            Err(ObjectStoreError::NotFound { .. }) => {
                debug!(location = %self.location, "lease already gone at release");
            }
            Err(e) => {
                warn!(location = %self.location, error = %e, "lease release failed, stale lease expires via TTL");
            }
        }
    }

    fn sleep_interval(&self) -> Duration {
        let jitter_ms = self.policy.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.policy.retry_delay;
        }
        // Rng created per call to avoid holding a non-Send type across await.
        let extra = rand::rng().random_range(0..=jitter_ms);
        self.policy.retry_delay + Duration::from_millis(extra)
    }
}
