//! HTTP handlers.

use std::time::Instant;

use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::coordinator;
use crate::error::IncrementError;
use crate::lock::LeaseLock;
use crate::server::AppState;
use crate::state::Actor;

/// Response body for a successful increment.
#[derive(Debug, Serialize)]
pub struct IncrementResponse {
    /// Always `"ok"` on the success path.
    pub status: &'static str,
    /// Wall-clock time spent on the whole acquire-mutate-release sequence.
    pub latency_ms: u64,
    /// Counter value after this call's increment.
    pub counter: u64,
    /// Who is expected to increment next.
    pub next_actor: Actor,
}

/// `GET|POST /increment` - lease-guarded counter bump.
///
/// Runs the full acquire, read-modify-write, release sequence against the
/// configured store. 409 when the lease stays contended through the attempt
/// budget, 500 for configuration and backend failures.
pub async fn increment(State(state): State<AppState>) -> Result<Json<IncrementResponse>, IncrementError> {
    let start = Instant::now();

    let store = state.store.clone().ok_or_else(|| IncrementError::Config {
        reason: "BUCKET_NAME not set".to_string(),
    })?;

    let lock = LeaseLock::new(
        store.clone(),
        state.config.storage.lock_object.clone(),
        state.config.lock.ttl,
        state.config.lock.retry.clone(),
    );
    let state_location = state.config.storage.state_object.clone();

    // The cycle runs detached from the request future: a client disconnect
    // drops this handler, and the sequence must still reach release once it
    // has acquired the lease.
    let updated = tokio::spawn(async move {
        coordinator::increment_cycle(store, &state_location, &lock).await
    })
    .await
    .map_err(|e| IncrementError::Backend {
        reason: format!("increment task failed: {e}"),
    })??;

    Ok(Json(IncrementResponse {
        status: "ok",
        latency_ms: start.elapsed().as_millis() as u64,
        counter: updated.counter,
        next_actor: updated.next_actor,
    }))
}

/// Query parameters for `/sum`.
///
/// Kept as raw strings so missing and non-numeric values both map to 400
/// with a JSON error body instead of axum's default rejection.
#[derive(Debug, Deserialize)]
pub struct SumParams {
    a: Option<String>,
    b: Option<String>,
}

/// Response body for `/sum`.
#[derive(Debug, Serialize)]
pub struct SumResponse {
    a: f64,
    b: f64,
    sum: f64,
}

/// `GET /sum?a=<num>&b=<num>` - stateless addition.
///
/// No interaction with the lock or state subsystem.
pub async fn sum(Query(params): Query<SumParams>) -> Response {
    let (Some(a_raw), Some(b_raw)) = (params.a, params.b) else {
        return bad_request("missing 'a' or 'b' query parameter");
    };
    let (Ok(a), Ok(b)) = (a_raw.parse::<f64>(), b_raw.parse::<f64>()) else {
        return bad_request("query parameters 'a' and 'b' must be valid numbers");
    };

    Json(SumResponse { a, b, sum: a + b }).into_response()
}

/// `GET /health` - liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
