//! Object storage abstraction.
//!
//! The coordination protocol needs four primitives from its backing store:
//! read, unconditional write, conditional create, and delete. The conditional
//! create ("create-if-absent") is the atomic test-and-set that lock
//! acquisition is built on, so implementations must report a create-time
//! conflict distinctly from every other failure.

mod gcs;
mod memory;

pub use gcs::GcsObjectStore;
pub use memory::InMemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use snafu::Snafu;

/// Errors from object store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ObjectStoreError {
    /// No object exists at the location.
    #[snafu(display("object not found at '{location}'"))]
    NotFound {
        /// The requested object location.
        location: String,
    },

    /// Conditional create lost to an existing object.
    #[snafu(display("object already exists at '{location}'"))]
    AlreadyExists {
        /// The contested object location.
        location: String,
    },

    /// Any other backend failure (network, auth, server error).
    #[snafu(display("storage backend error at '{location}': {reason}"))]
    Backend {
        /// The object location involved.
        location: String,
        /// Human-readable description of the failure.
        reason: String,
    },
}

/// Minimal object-store client surface used by the coordination protocol.
///
/// Implementations must be safe for concurrent use from multiple tasks; the
/// service shares a single client across all request handlers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `location`.
    async fn get(&self, location: &str) -> Result<Bytes, ObjectStoreError>;

    /// Write `payload` to `location`, overwriting any existing object.
    async fn put(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError>;

    /// Create the object at `location` only if nothing exists there.
    ///
    /// Returns [`ObjectStoreError::AlreadyExists`] when the location is
    /// occupied. This is the single-writer-wins primitive the lease protocol
    /// relies on; the store guarantees at most one concurrent creator wins.
    async fn create_if_absent(&self, location: &str, payload: Bytes) -> Result<(), ObjectStoreError>;

    /// Delete the object at `location`.
    ///
    /// Deleting a missing object reports [`ObjectStoreError::NotFound`] so
    /// callers can observe it, though most treat it as benign.
    async fn delete(&self, location: &str) -> Result<(), ObjectStoreError>;
}
