//! Service entry point.

use std::sync::Arc;

use tracing::info;
use tracing::warn;

use switcher::config::AppConfig;
use switcher::config::StorageConfig;
use switcher::config::StoreBackend;
use switcher::server::build_router;
use switcher::server::AppState;
use switcher::store::GcsObjectStore;
use switcher::store::InMemoryObjectStore;
use switcher::store::ObjectStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    let store = build_store(&config.storage);

    let addr = format!("{}:{}", config.network.http_bind_addr, config.network.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "switcher listening");

    let state = AppState {
        config: Arc::new(config),
        store,
    };
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

/// Construct the configured store client.
///
/// A missing `BUCKET_NAME` does not abort startup; the increment handler
/// rejects requests with a config error until the bucket is provided.
fn build_store(storage: &StorageConfig) -> Option<Arc<dyn ObjectStore>> {
    match (storage.backend, storage.bucket.as_deref()) {
        (StoreBackend::Memory, _) => {
            let store: Arc<dyn ObjectStore> = InMemoryObjectStore::new();
            Some(store)
        }
        (StoreBackend::Gcs, Some(bucket)) => {
            let store: Arc<dyn ObjectStore> = Arc::new(GcsObjectStore::new(bucket));
            Some(store)
        }
        (StoreBackend::Gcs, None) => {
            warn!("BUCKET_NAME not set; /increment will reject requests");
            None
        }
    }
}
