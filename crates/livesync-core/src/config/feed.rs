//! Change feed and watched collection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Change feed subscriber configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Capacity used by descriptors that do not set their own.
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,
    /// Buffer size of the per-subscription event queue.
    #[serde(default = "default_queue_buffer")]
    pub queue_buffer_size: usize,
    /// Delay before re-opening a channel whose stream ended or failed to open.
    #[serde(default = "default_reopen_delay")]
    pub reopen_delay_ms: u64,
    /// Window after a status transition during which the connection is
    /// reported as "recently changed".
    #[serde(default = "default_flap_window")]
    pub flap_window_ms: u64,
}

impl FeedConfig {
    /// Channel re-open delay as a [`Duration`].
    pub fn reopen_delay(&self) -> Duration {
        Duration::from_millis(self.reopen_delay_ms)
    }

    /// Flap window as a [`Duration`].
    pub fn flap_window(&self) -> Duration {
        Duration::from_millis(self.flap_window_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            queue_buffer_size: default_queue_buffer(),
            reopen_delay_ms: default_reopen_delay(),
            flap_window_ms: default_flap_window(),
        }
    }
}

fn default_capacity() -> usize {
    20
}

fn default_queue_buffer() -> usize {
    256
}

fn default_reopen_delay() -> u64 {
    5_000
}

fn default_flap_window() -> u64 {
    2_000
}
