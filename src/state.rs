//! Shared counter document and its per-call mutation.

use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Identity stamped into `metadata.last_source` on every successful call.
pub const SOURCE_NAME: &str = "switcher";

/// Description written on every successful call.
const DESCRIPTION: &str = "Incremented by switcher";

/// Which cooperating caller is expected to perform the next increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Actor {
    /// The long-running VM caller.
    Vm,
    /// The function-as-a-service caller.
    Faas,
    /// Any unrecognized stored value.
    ///
    /// The toggle is binary, not validated against the recognized set: only
    /// `"vm"` hands off to `"faas"`, everything else hands off to `"vm"`.
    /// Never written back, because the toggle runs before every write.
    #[default]
    Unknown,
}

impl From<String> for Actor {
    fn from(value: String) -> Self {
        match value.as_str() {
            "vm" => Actor::Vm,
            "faas" => Actor::Faas,
            _ => Actor::Unknown,
        }
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.as_str().to_string()
    }
}

impl Actor {
    /// Flip to the other cooperating caller.
    pub fn other(self) -> Actor {
        match self {
            Actor::Vm => Actor::Faas,
            Actor::Faas | Actor::Unknown => Actor::Vm,
        }
    }

    /// Wire representation of this actor.
    pub fn as_str(self) -> &'static str {
        match self {
            Actor::Vm => "vm",
            Actor::Faas => "faas",
            Actor::Unknown => "unknown",
        }
    }
}

/// Shared counter state, persisted as a single JSON document.
///
/// Owned exclusively by whichever caller currently holds the lease; at any
/// instant at most one in-flight mutation may be applied to it. All fields
/// default so that partially populated documents decode leniently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SwitcherState {
    /// Monotonically non-decreasing across successful calls.
    #[serde(default)]
    pub counter: u64,
    /// Free-form description, replaced on every successful call.
    #[serde(default)]
    pub description: String,
    /// Open-schema annotations. `last_updated` and `last_source` are
    /// stamped on every successful call.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Who is expected to increment next; toggled on every call.
    #[serde(default)]
    pub next_actor: Actor,
}

/// The per-call mutation: bump the counter, stamp provenance metadata, and
/// hand off to the other actor.
///
/// Pure with respect to the store; callers apply it inside the lease-guarded
/// read-modify-write cycle.
pub fn apply_increment(mut state: SwitcherState) -> SwitcherState {
    state.counter += 1;
    state.metadata.insert(
        "last_updated".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    state
        .metadata
        .insert("last_source".to_string(), Value::String(SOURCE_NAME.to_string()));
    state.description = DESCRIPTION.to_string();
    state.next_actor = state.next_actor.other();
    state
}
