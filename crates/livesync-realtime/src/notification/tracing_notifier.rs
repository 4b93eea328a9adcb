//! Notifier that writes notices to the log.

use tracing::{error, info, warn};

use livesync_core::traits::Notifier;
use livesync_core::types::{Notice, NoticeLevel};

/// Logs every notice at a level matching its presentation level.
///
/// Used by hosts without a UI surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Create a new tracing notifier.
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        let kind = serde_json::to_string(&notice.kind).unwrap_or_default();
        match notice.level {
            NoticeLevel::Info => info!(kind = %kind, "{}", notice.message),
            NoticeLevel::Warning => warn!(kind = %kind, "{}", notice.message),
            NoticeLevel::Error => error!(kind = %kind, "{}", notice.message),
        }
    }
}
