//! Session fencing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session fencing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Period of the reconciliation tick in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Table holding one session row per account.
    #[serde(default = "default_table")]
    pub table: String,
}

impl SessionConfig {
    /// Poll period as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            table: default_table(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60_000
}

fn default_table() -> String {
    "user_sessions".to_string()
}
