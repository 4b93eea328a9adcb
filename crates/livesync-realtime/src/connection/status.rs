//! Connection state tracker: raw channel status to a small consumer-facing
//! enum, with a "recently changed" signal that absorbs flapping.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use livesync_core::events::ChannelStatus;

/// Connection status exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// The channel is joined and delivering events.
    Connected,
    /// No channel, or the channel was closed or failed to open.
    Disconnected,
    /// The channel errored and the transport is retrying.
    Reconnecting,
}

impl ConnectionStatus {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

/// Status plus transition bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// Current status.
    pub status: ConnectionStatus,
    /// When the status last changed (or the tracker was created).
    pub changed_at: Instant,
    /// Number of transitions so far.
    pub transitions: u64,
}

impl ConnectionSnapshot {
    /// Whether a transition happened within `window`.
    pub fn recently_changed(&self, window: Duration) -> bool {
        self.transitions > 0 && self.changed_at.elapsed() < window
    }
}

/// Owns the status of one subscription. Only the subscription task writes
/// it; consumers read through [`ConnectionWatch`].
#[derive(Debug)]
pub struct ConnectionStateTracker {
    tx: watch::Sender<ConnectionSnapshot>,
    flap_window: Duration,
}

impl ConnectionStateTracker {
    /// Creates a tracker in the `Disconnected` state.
    pub fn new(flap_window: Duration) -> Self {
        let (tx, _) = watch::channel(ConnectionSnapshot {
            status: ConnectionStatus::Disconnected,
            changed_at: Instant::now(),
            transitions: 0,
        });
        Self { tx, flap_window }
    }

    /// Apply a raw transport status and return the resulting status.
    pub fn on_status(&self, raw: &ChannelStatus) -> ConnectionStatus {
        let next = match raw {
            ChannelStatus::Subscribed => ConnectionStatus::Connected,
            ChannelStatus::ChannelError { .. } | ChannelStatus::TimedOut => {
                ConnectionStatus::Reconnecting
            }
            ChannelStatus::Closed => ConnectionStatus::Disconnected,
        };
        self.transition(next)
    }

    /// Record that a snapshot fetch or channel open failed.
    pub fn mark_failed(&self) -> ConnectionStatus {
        self.transition(ConnectionStatus::Disconnected)
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.tx.borrow().status
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        *self.tx.borrow()
    }

    /// Whether the status changed within the flap window.
    pub fn recently_changed(&self) -> bool {
        self.tx.borrow().recently_changed(self.flap_window)
    }

    /// A read-only view for consumers.
    pub fn watch(&self) -> ConnectionWatch {
        ConnectionWatch {
            rx: self.tx.subscribe(),
            flap_window: self.flap_window,
        }
    }

    fn transition(&self, next: ConnectionStatus) -> ConnectionStatus {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.status == next {
                return false;
            }
            debug!(
                from = snapshot.status.as_str(),
                to = next.as_str(),
                "Connection status changed"
            );
            snapshot.status = next;
            snapshot.changed_at = Instant::now();
            snapshot.transitions += 1;
            true
        });
        next
    }
}

/// Consumer-side view of a [`ConnectionStateTracker`].
#[derive(Debug, Clone)]
pub struct ConnectionWatch {
    rx: watch::Receiver<ConnectionSnapshot>,
    flap_window: Duration,
}

impl ConnectionWatch {
    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.rx.borrow().status
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        *self.rx.borrow()
    }

    /// Whether the status changed within the flap window.
    pub fn recently_changed(&self) -> bool {
        self.rx.borrow().recently_changed(self.flap_window)
    }

    /// Wait until the status is `status`, returning immediately if it already
    /// is. Returns `false` once the tracker is gone.
    pub async fn wait_for(&mut self, status: ConnectionStatus) -> bool {
        self.rx.wait_for(|s| s.status == status).await.is_ok()
    }

    /// Wait for the next transition. Returns `None` once the tracker is gone.
    pub async fn changed(&mut self) -> Option<ConnectionStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ConnectionStateTracker {
        ConnectionStateTracker::new(Duration::from_millis(2000))
    }

    #[tokio::test]
    async fn test_initially_disconnected() {
        let t = tracker();
        assert_eq!(t.status(), ConnectionStatus::Disconnected);
        assert!(!t.recently_changed());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let t = tracker();
        assert_eq!(t.on_status(&ChannelStatus::Subscribed), ConnectionStatus::Connected);
        assert_eq!(
            t.on_status(&ChannelStatus::ChannelError { reason: "boom".into() }),
            ConnectionStatus::Reconnecting
        );
        assert_eq!(t.on_status(&ChannelStatus::TimedOut), ConnectionStatus::Reconnecting);
        assert_eq!(t.on_status(&ChannelStatus::Closed), ConnectionStatus::Disconnected);
        assert_eq!(t.snapshot().transitions, 3);
    }

    #[tokio::test]
    async fn test_repeated_status_is_not_a_transition() {
        let t = tracker();
        t.on_status(&ChannelStatus::Subscribed);
        t.on_status(&ChannelStatus::Subscribed);
        assert_eq!(t.snapshot().transitions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recently_changed_expires_after_window() {
        let t = tracker();
        let view = t.watch();
        t.on_status(&ChannelStatus::Subscribed);
        assert!(view.recently_changed());

        tokio::time::advance(Duration::from_millis(1999)).await;
        assert!(t.recently_changed());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!t.recently_changed());
        assert_eq!(view.status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_watch_sees_transitions() {
        let t = tracker();
        let mut view = t.watch();
        t.on_status(&ChannelStatus::Subscribed);
        assert_eq!(view.changed().await, Some(ConnectionStatus::Connected));
        t.mark_failed();
        assert_eq!(view.changed().await, Some(ConnectionStatus::Disconnected));
        drop(t);
        assert_eq!(view.changed().await, None);
    }

    #[tokio::test]
    async fn test_wait_for_returns_on_current_status() {
        let t = tracker();
        let mut view = t.watch();
        t.on_status(&ChannelStatus::Subscribed);
        assert!(view.wait_for(ConnectionStatus::Connected).await);
        assert!(view.wait_for(ConnectionStatus::Connected).await);
        drop(t);
        assert!(!view.wait_for(ConnectionStatus::Reconnecting).await);
    }
}
