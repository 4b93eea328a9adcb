//! Wires auth events to the fencing monitor and the inactivity watchdog.

use tracing::{debug, info};

use livesync_core::events::AuthEvent;
use livesync_core::types::{AuthSession, SessionToken};

use crate::presence::InactivityWatchdog;

use super::fencing::{FencingState, SessionFencingMonitor};

/// Installs and tears down the per-session listeners.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    fencing: SessionFencingMonitor,
    watchdog: InactivityWatchdog,
}

impl SessionLifecycle {
    /// Creates a new lifecycle handler.
    pub fn new(fencing: SessionFencingMonitor, watchdog: InactivityWatchdog) -> Self {
        Self { fencing, watchdog }
    }

    /// The fencing monitor.
    pub fn fencing(&self) -> &SessionFencingMonitor {
        &self.fencing
    }

    /// The inactivity watchdog.
    pub fn watchdog(&self) -> &InactivityWatchdog {
        &self.watchdog
    }

    /// React to one auth event.
    pub async fn handle(&self, event: &AuthEvent) {
        debug!(event = event.as_str(), "Auth event");
        match event {
            AuthEvent::SignedIn { session } => self.install(session).await,
            AuthEvent::TokenRefreshed { .. } => {
                if let Err(e) = self.fencing.touch().await {
                    debug!(error = %e, "Touch after token refresh failed");
                }
            }
            AuthEvent::SignedOut => self.uninstall().await,
        }
    }

    /// Register a fencing token for `session` and arm the watchdog.
    ///
    /// A repeated sign-in for an account this instance already holds (and
    /// still polls) keeps the existing token and only touches the row.
    pub async fn install(&self, session: &AuthSession) {
        let current = self.fencing.state().await;
        let already_held = matches!(
            current,
            FencingState::Registered { account_id, .. } if account_id == session.account_id
        ) && self.fencing.is_polling().await;

        if already_held {
            if let Err(e) = self.fencing.touch().await {
                debug!(error = %e, "Touch on repeated sign-in failed");
            }
        } else {
            self.fencing
                .start(session.account_id, SessionToken::new(), session.device.clone())
                .await;
        }
        self.watchdog.arm_default().await;
        info!(account = %session.account_id, "Session listeners installed");
    }

    /// Stop fencing and disarm the watchdog. Idempotent.
    pub async fn uninstall(&self) {
        self.fencing.stop().await;
        self.watchdog.disarm().await;
        debug!("Session listeners removed");
    }
}
