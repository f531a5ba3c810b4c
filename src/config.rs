//! Environment-based service configuration.
//!
//! Single source of truth for tunables, read from environment variables with
//! sensible defaults. `BUCKET_NAME` is deliberately optional at load time:
//! its absence fails individual increment requests, not process startup.

use std::str::FromStr;
use std::time::Duration;

use snafu::Snafu;

use crate::lock::RetryPolicy;

/// Default values for configuration.
mod defaults {
    pub fn http_port() -> u16 {
        8080
    }
    pub fn http_bind_addr() -> String {
        "0.0.0.0".to_string()
    }
    pub fn state_object() -> String {
        "switcher.json".to_string()
    }
    pub fn lock_object() -> String {
        "increment.lock".to_string()
    }
    pub fn lock_ttl_secs() -> u64 {
        30
    }
    pub fn lock_max_attempts() -> u32 {
        5
    }
    pub fn lock_retry_delay_ms() -> u64 {
        100
    }
    pub fn lock_retry_jitter_ms() -> u64 {
        0
    }
}

/// Configuration loading errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// An environment variable held an unusable value.
    #[snafu(display("invalid value for {key}: '{value}' ({reason})"))]
    InvalidValue {
        /// The environment variable.
        key: String,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Which object store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Storage over the JSON API.
    Gcs,
    /// In-process map, for tests and local runs.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gcs" => Ok(StoreBackend::Gcs),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown backend '{other}', expected 'gcs' or 'memory'")),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Listener port.
    pub http_port: u16,
    /// Listener bind address.
    pub http_bind_addr: String,
}

/// Storage locations.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding both objects. `None` when `BUCKET_NAME` is unset,
    /// turning increment requests into per-request config errors.
    pub bucket: Option<String>,
    /// Location of the state document.
    pub state_object: String,
    /// Location of the lease object.
    pub lock_object: String,
    /// Which store implementation to construct at startup.
    pub backend: StoreBackend,
}

/// Lease and retry tuning.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Staleness bound recorded in each lease.
    pub ttl: Duration,
    /// Acquisition retry behavior.
    pub retry: RetryPolicy,
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub network: NetworkConfig,
    /// Object locations and backend selection.
    pub storage: StorageConfig,
    /// Lease tuning.
    pub lock: LockConfig,
}

impl AppConfig {
    /// Load the full configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            network: NetworkConfig {
                http_port: parse_var("HTTP_PORT", env_var("HTTP_PORT"), defaults::http_port())?,
                http_bind_addr: env_var("HTTP_BIND_ADDR").unwrap_or_else(defaults::http_bind_addr),
            },
            storage: StorageConfig {
                bucket: env_var("BUCKET_NAME"),
                state_object: env_var("STATE_OBJECT").unwrap_or_else(defaults::state_object),
                lock_object: env_var("LOCK_OBJECT").unwrap_or_else(defaults::lock_object),
                backend: parse_var("STORE_BACKEND", env_var("STORE_BACKEND"), StoreBackend::Gcs)?,
            },
            lock: LockConfig {
                ttl: Duration::from_secs(parse_var(
                    "LOCK_TTL_SECS",
                    env_var("LOCK_TTL_SECS"),
                    defaults::lock_ttl_secs(),
                )?),
                retry: RetryPolicy {
                    max_attempts: parse_var(
                        "LOCK_MAX_ATTEMPTS",
                        env_var("LOCK_MAX_ATTEMPTS"),
                        defaults::lock_max_attempts(),
                    )?,
                    retry_delay: Duration::from_millis(parse_var(
                        "LOCK_RETRY_DELAY_MS",
                        env_var("LOCK_RETRY_DELAY_MS"),
                        defaults::lock_retry_delay_ms(),
                    )?),
                    jitter: Duration::from_millis(parse_var(
                        "LOCK_RETRY_JITTER_MS",
                        env_var("LOCK_RETRY_JITTER_MS"),
                        defaults::lock_retry_jitter_ms(),
                    )?),
                },
            },
        })
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Parse an optional raw value, falling back to `default` when absent.
fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }),
    }
}
