//! Request-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use snafu::Snafu;
use tracing::debug;
use tracing::error;

use crate::coordinator::StateError;

/// Everything that can fail an `/increment` request.
///
/// All variants surface to the HTTP caller as a JSON `{"error": ...}` body;
/// only lock acquisition has internal retries, and only on conflict.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IncrementError {
    /// Required configuration is absent.
    #[snafu(display("{reason}"))]
    Config {
        /// What is missing.
        reason: String,
    },

    /// The lease could not be acquired within the attempt budget.
    ///
    /// Expected under contention; logged at debug, never as a failure.
    #[snafu(display("could not acquire lock"))]
    LockContention {
        /// How many attempts were made.
        attempts: u32,
    },

    /// The store failed below the lock layer (unreachable, auth failure).
    #[snafu(display("storage backend error: {reason}"))]
    Backend {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The state blob was missing or malformed.
    #[snafu(display("{source}"))]
    StateRead {
        /// The underlying read failure.
        source: StateError,
    },

    /// The updated state could not be written back.
    #[snafu(display("{source}"))]
    StateWrite {
        /// The underlying write failure.
        source: StateError,
    },
}

impl IncrementError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IncrementError::LockContention { .. } => StatusCode::CONFLICT,
            IncrementError::Config { .. }
            | IncrementError::Backend { .. }
            | IncrementError::StateRead { .. }
            | IncrementError::StateWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IncrementError {
    fn into_response(self) -> Response {
        match &self {
            IncrementError::LockContention { attempts } => {
                debug!(attempts, "increment rejected: lease contended");
            }
            other => error!(error = %other, "increment failed"),
        }
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_maps_to_409() {
        let err = IncrementError::LockContention { attempts: 5 };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "could not acquire lock");
    }

    #[test]
    fn test_everything_else_maps_to_500() {
        let cases = [
            IncrementError::Config {
                reason: "BUCKET_NAME not set".to_string(),
            },
            IncrementError::Backend {
                reason: "unreachable".to_string(),
            },
            IncrementError::StateRead {
                source: StateError::Read {
                    location: "switcher.json".to_string(),
                    reason: "gone".to_string(),
                },
            },
            IncrementError::StateWrite {
                source: StateError::Write {
                    location: "switcher.json".to_string(),
                    reason: "refused".to_string(),
                },
            },
        ];
        for err in cases {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR, "{err}");
        }
    }
}
