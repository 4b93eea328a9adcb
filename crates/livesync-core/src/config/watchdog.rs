//! Inactivity watchdog configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Inactivity watchdog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Idle time before forced logout, in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// How long before logout the warning is shown.
    #[serde(default = "default_warning_lead")]
    pub warning_lead_ms: u64,
    /// Minimum spacing between accepted activity signals.
    #[serde(default = "default_throttle")]
    pub throttle_ms: u64,
    /// Delay between accepting a signal and re-arming the timers.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

impl WatchdogConfig {
    /// Logout timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Warning lead as a [`Duration`].
    pub fn warning_lead(&self) -> Duration {
        Duration::from_millis(self.warning_lead_ms)
    }

    /// Throttle window as a [`Duration`].
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            warning_lead_ms: default_warning_lead(),
            throttle_ms: default_throttle(),
            debounce_ms: default_debounce(),
        }
    }
}

fn default_timeout() -> u64 {
    240_000
}

fn default_warning_lead() -> u64 {
    30_000
}

fn default_throttle() -> u64 {
    1_000
}

fn default_debounce() -> u64 {
    100
}
