//! Top-level sync engine that ties the subsystems to injected collaborators.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use livesync_core::config::EngineConfig;
use livesync_core::error::AppError;
use livesync_core::events::AuthEvent;
use livesync_core::result::AppResult;
use livesync_core::traits::{AuthProvider, ChangeFeedService, DurableStore, Notifier};
use livesync_core::types::{FeedDescriptor, Notice};

use crate::feed::{ChangeFeedSubscriber, SubscriptionHandle};
use crate::presence::{ActivityKind, InactivityWatchdog};
use crate::session_control::{SessionFencingMonitor, SessionLifecycle};

/// Central engine: feed subscriptions plus the per-session fencing monitor
/// and inactivity watchdog, driven by auth events.
#[derive(Clone)]
pub struct SyncEngine {
    /// Opens feed subscriptions.
    pub subscriber: ChangeFeedSubscriber,
    /// Per-session listeners.
    pub lifecycle: SessionLifecycle,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish()
    }
}

impl SyncEngine {
    /// Creates a new engine. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: EngineConfig,
        feed: Arc<dyn ChangeFeedService>,
        store: Arc<dyn DurableStore>,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let subscriber = ChangeFeedSubscriber::new(feed, store.clone(), config.feed.clone());
        let fencing = SessionFencingMonitor::new(
            config.session.clone(),
            store,
            auth.clone(),
            notifier.clone(),
        );
        let watchdog =
            InactivityWatchdog::new(config.watchdog.clone(), auth.clone(), notifier.clone());
        let lifecycle = SessionLifecycle::new(fencing, watchdog);

        info!("Sync engine initialized");

        Self {
            subscriber,
            lifecycle,
            auth,
            notifier,
            config,
            shutdown_tx,
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The session fencing monitor.
    pub fn fencing(&self) -> &SessionFencingMonitor {
        self.lifecycle.fencing()
    }

    /// The inactivity watchdog.
    pub fn watchdog(&self) -> &InactivityWatchdog {
        self.lifecycle.watchdog()
    }

    /// Install session listeners for the current session, if any, and start
    /// following auth events. Calling it again while running is a no-op.
    pub async fn start(&self) -> AppResult<()> {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            warn!("Sync engine already started");
            return Ok(());
        }

        // Subscribe before reading the session so no sign-in is missed.
        let events = self.auth.subscribe_events();

        match self.auth.get_session().await {
            Ok(Some(session)) => self.lifecycle.install(&session).await,
            Ok(None) => {
                let err = AppError::auth_unavailable("No session at startup");
                info!(error = %err, "Session listeners not installed, waiting for sign-in");
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session at startup, waiting for sign-in");
            }
        }

        let lifecycle = self.lifecycle.clone();
        let auth = self.auth.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        *listener = Some(tokio::spawn(run_auth_listener(
            lifecycle,
            auth,
            events,
            shutdown_rx,
        )));

        info!("Sync engine started");
        Ok(())
    }

    /// Open a feed subscription. The returned handle is owned by the caller.
    pub async fn subscribe(&self, descriptor: FeedDescriptor) -> AppResult<SubscriptionHandle> {
        self.subscriber.subscribe(descriptor).await
    }

    /// Report user activity to the watchdog. Returns whether it was accepted.
    pub async fn record_activity(&self, kind: ActivityKind) -> bool {
        self.lifecycle.watchdog().on_activity(kind).await
    }

    /// Report a raw host input event name to the watchdog.
    pub async fn record_raw_activity(&self, name: &str) -> bool {
        self.lifecycle.watchdog().on_raw_activity(name).await
    }

    /// Surface a host-side failure. Conflicts become notices; everything
    /// else is logged.
    pub fn report_error(&self, err: &AppError) {
        match Notice::from_error(err) {
            Some(notice) => {
                debug!(error = %err, "Surfacing error as notice");
                self.notifier.notify(notice);
            }
            None if err.is_transient() => warn!(error = %err, "Transient failure reported"),
            None => error!(error = %err, "Failure reported"),
        }
    }

    /// Stop following auth events and remove session listeners.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down sync engine");

        let _ = self.shutdown_tx.send(());

        let task = self.listener.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                let err = AppError::teardown(format!("Auth listener did not stop cleanly: {e}"));
                warn!(error = %err, "Teardown failed");
            }
        }

        self.lifecycle.uninstall().await;

        info!("Sync engine shut down");
        Ok(())
    }
}

async fn run_auth_listener(
    lifecycle: SessionLifecycle,
    auth: Arc<dyn AuthProvider>,
    mut events: broadcast::Receiver<AuthEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            received = events.recv() => received,
        };

        match received {
            Ok(event) => lifecycle.handle(&event).await,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth listener lagged, resynchronising from current session");
                match auth.get_session().await {
                    Ok(Some(session)) => lifecycle.install(&session).await,
                    Ok(None) => lifecycle.uninstall().await,
                    Err(e) => warn!(error = %e, "Failed to read session after lag"),
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Auth event stream closed");
                break;
            }
        }
    }

    debug!("Auth listener stopped");
}
