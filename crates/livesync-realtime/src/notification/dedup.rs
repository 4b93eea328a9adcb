//! Suppression of identical notices raised in quick succession.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use livesync_core::traits::Notifier;
use livesync_core::types::Notice;

/// Wraps a notifier and drops a notice when an identical one (same kind and
/// message) was forwarded within `window`.
#[derive(Debug)]
pub struct DedupNotifier {
    inner: Arc<dyn Notifier>,
    window: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl DedupNotifier {
    /// Wrap `inner` with a suppression window.
    pub fn new(inner: Arc<dyn Notifier>, window: Duration) -> Self {
        Self {
            inner,
            window,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    fn key(notice: &Notice) -> String {
        let kind = serde_json::to_string(&notice.kind).unwrap_or_default();
        format!("{kind}:{}", notice.message)
    }

    fn should_forward(&self, key: String) -> bool {
        let mut map = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(last) = map.get(&key) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }

        // Keep entries for 10x the window
        let cutoff = self.window * 10;
        map.retain(|_, v| now.duration_since(*v) < cutoff);
        map.insert(key, now);
        true
    }
}

impl Notifier for DedupNotifier {
    fn notify(&self, notice: Notice) {
        let key = Self::key(&notice);
        if self.should_forward(key) {
            self.inner.notify(notice);
        } else {
            trace!(message = %notice.message, "Notice deduplicated");
        }
    }
}
