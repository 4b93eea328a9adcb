//! Engine configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from a
//! layered set of sources. Each sub-module represents a logical
//! configuration section. Every field carries a serde default so an empty
//! source produces a usable configuration.

pub mod feed;
pub mod logging;
pub mod session;
pub mod watchdog;

use serde::{Deserialize, Serialize};

use self::feed::FeedConfig;
use self::logging::LoggingConfig;
use self::session::SessionConfig;
use self::watchdog::WatchdogConfig;

use crate::error::AppError;

/// Root engine configuration.
///
/// This struct is the top-level deserialization target for the merged
/// configuration files (default + environment overlay) and `LIVESYNC__*`
/// environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Change feed and collection settings.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Session fencing settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Inactivity watchdog settings.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration.
    ///
    /// Merges `config/default`, an environment-specific overlay
    /// `config/{env}` and environment variables prefixed with `LIVESYNC__`,
    /// then validates the result.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LIVESYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.feed.default_capacity == 0 {
            return Err(AppError::validation("feed.default_capacity must be at least 1"));
        }
        if self.session.poll_interval_ms == 0 {
            return Err(AppError::validation("session.poll_interval_ms must be positive"));
        }
        if self.watchdog.timeout_ms == 0 {
            return Err(AppError::validation("watchdog.timeout_ms must be positive"));
        }
        if self.watchdog.debounce_ms >= self.watchdog.throttle_ms {
            return Err(AppError::validation(
                "watchdog.debounce_ms must be shorter than watchdog.throttle_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.watchdog.timeout_ms, 240_000);
        assert_eq!(config.session.poll_interval_ms, 60_000);
        assert_eq!(config.feed.default_capacity, 20);
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: EngineConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.watchdog.warning_lead_ms, 30_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = EngineConfig::default();
        config.feed.default_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debounce_longer_than_throttle_rejected() {
        let mut config = EngineConfig::default();
        config.watchdog.debounce_ms = 1500;
        assert!(config.validate().is_err());
    }
}
