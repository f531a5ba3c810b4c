//! Lease-guarded shared counter service over object storage.
//!
//! Two cooperating callers take turns incrementing a counter persisted as a
//! JSON document in a remote object store. The store has no transactions, so
//! mutual exclusion comes from an advisory lease built on the store's
//! create-if-absent primitive:
//!
//! - [`LeaseLock`] - bounded-retry acquisition and best-effort release
//! - [`coordinator::read_modify_write`] - the guarded state cycle
//! - [`ObjectStore`] - the seam to the backing store
//!
//! The HTTP surface is a single `/increment` endpoint plus an unrelated
//! stateless `/sum` endpoint used for testing the deployment path.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod lock;
pub mod server;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use config::ConfigError;
pub use config::StoreBackend;
pub use coordinator::StateError;
pub use error::IncrementError;
pub use lock::Lease;
pub use lock::LeaseLock;
pub use lock::LockError;
pub use lock::RetryPolicy;
pub use server::build_router;
pub use server::AppState;
pub use state::Actor;
pub use state::SwitcherState;
pub use store::GcsObjectStore;
pub use store::InMemoryObjectStore;
pub use store::ObjectStore;
pub use store::ObjectStoreError;
