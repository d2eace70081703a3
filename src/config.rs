//! Engine configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration for an [`ActivationEngine`](crate::engine::ActivationEngine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// State tree the store starts from. Empty object unless overridden.
    #[serde(default = "default_initial_state")]
    pub initial_state: Value,

    /// Buffer size of the observer taps. A subscriber that falls further
    /// behind than this loses the oldest events.
    #[serde(default = "default_tap_capacity")]
    pub tap_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_state: default_initial_state(),
            tap_capacity: default_tap_capacity(),
        }
    }
}

fn default_initial_state() -> Value {
    Value::Object(Map::new())
}

fn default_tap_capacity() -> usize {
    1024
}
