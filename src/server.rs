//! Axum router and shared application state.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::config::AppConfig;
use crate::handlers;
use crate::store::ObjectStore;

/// Shared handler state: configuration plus the injected store client.
///
/// The store is the only cross-request resource; every other piece of
/// coordination lives in the external lease object. `store` is `None` when
/// `BUCKET_NAME` is not configured, and the increment handler turns that
/// into a per-request error instead of failing startup.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Store client, shared by all request handlers.
    pub store: Option<Arc<dyn ObjectStore>>,
}

/// Build the complete router.
///
/// Routes:
/// - `GET|POST /increment` - lease-guarded counter increment
/// - `GET  /sum`    - stateless addition (no lock/state interaction)
/// - `GET  /health` - liveness probe
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/increment", get(handlers::increment).post(handlers::increment))
        .route("/sum", get(handlers::sum))
        .route("/health", get(handlers::health))
        .with_state(state)
}
