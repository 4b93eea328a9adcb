//! Single-active-session fencing.
//!
//! Each authenticated instance upserts the one row for its account with a
//! fresh token (last-writer-wins) and then polls that row. When the stored
//! token is no longer ours, a newer registration won: this instance signs
//! itself out and raises a notice, exactly once.
//!
//! Eviction latency is bounded by the poll period. Two concurrent first-time
//! registrations may both overwrite before either reconciles; the later
//! write wins on the next tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use livesync_core::config::session::SessionConfig;
use livesync_core::error::AppError;
use livesync_core::result::AppResult;
use livesync_core::traits::{AuthProvider, DurableStore, Notifier};
use livesync_core::types::{AccountId, DeviceDescriptor, Notice, Record, SessionRecord, SessionToken};

/// Fencing state of this instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FencingState {
    /// No registration yet, or stopped after sign-out.
    Unregistered,
    /// This instance owns (or believes it owns) the account's session row.
    Registered {
        /// Account the row belongs to.
        account_id: AccountId,
        /// Token written by this instance.
        token: SessionToken,
    },
    /// A newer registration replaced ours and we signed out.
    Evicted {
        /// Account we were evicted from.
        account_id: AccountId,
    },
}

impl FencingState {
    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registered { .. } => "registered",
            Self::Evicted { .. } => "evicted",
        }
    }
}

#[derive(Debug)]
struct Ticker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner {
    config: SessionConfig,
    store: Arc<dyn DurableStore>,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<FencingState>,
    /// Bumped on every start and stop, only while `state` is locked.
    /// Writes issued for an older epoch are discarded.
    epoch: AtomicU64,
    ticker: Mutex<Option<Ticker>>,
}

/// Polls the session row and evicts this instance when it loses the race.
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct SessionFencingMonitor {
    inner: Arc<Inner>,
}

impl SessionFencingMonitor {
    /// Create an unregistered monitor.
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn DurableStore>,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                auth,
                notifier,
                state: Mutex::new(FencingState::Unregistered),
                epoch: AtomicU64::new(0),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Current state.
    pub async fn state(&self) -> FencingState {
        self.inner.state.lock().await.clone()
    }

    /// Upsert the account's session row with `token`, overwriting whatever
    /// registration was there.
    pub async fn register(
        &self,
        account_id: AccountId,
        token: SessionToken,
        device: DeviceDescriptor,
    ) -> AppResult<()> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        self.register_in(epoch, account_id, token, device).await?;
        Ok(())
    }

    /// Register on behalf of `epoch`. Returns `false` when the monitor was
    /// stopped or restarted before the write completed; the state is then
    /// left as the newer epoch set it.
    async fn register_in(
        &self,
        epoch: u64,
        account_id: AccountId,
        token: SessionToken,
        device: DeviceDescriptor,
    ) -> AppResult<bool> {
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            return Ok(false);
        }

        let row = SessionRecord {
            account_id,
            session_token: token,
            device,
            last_active: Utc::now(),
        }
        .to_record()?;

        self.inner
            .store
            .upsert(&self.inner.config.table, row, SessionRecord::KEY_FIELD)
            .await?;

        let mut state = self.inner.state.lock().await;
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!(account = %account_id, "Discarding registration from a stopped session");
            return Ok(false);
        }
        *state = FencingState::Registered { account_id, token };
        info!(account = %account_id, token = %token, "Session registered");
        Ok(true)
    }

    /// Compare the stored token with `token`. On a match the row's
    /// last-active time is touched and `true` is returned. On a mismatch
    /// (including a missing or malformed row) this instance is evicted and
    /// `false` is returned. Read failures are returned as errors and never
    /// evict.
    pub async fn reconcile(&self, account_id: AccountId, token: SessionToken) -> AppResult<bool> {
        let key = account_id.to_string();
        let stored = self
            .inner
            .store
            .select_one(&self.inner.config.table, SessionRecord::KEY_FIELD, &key)
            .await?;

        let stored = match stored.map(SessionRecord::from_record).transpose() {
            Ok(row) => row,
            Err(e) => {
                warn!(account = %account_id, error = %e, "Malformed session row, treating as missing");
                None
            }
        };
        let stored_token = stored.map(|row| row.session_token);

        if stored_token == Some(token) {
            if self.holds(account_id, token).await {
                if let Err(e) = self.touch_row(&key).await {
                    warn!(account = %account_id, error = %e, "Failed to touch session row");
                }
            }
            debug!(account = %account_id, "Session token matches");
            return Ok(true);
        }

        warn!(
            account = %account_id,
            ours = %token,
            stored = ?stored_token,
            "Session token mismatch"
        );
        self.evict(account_id, token).await;
        Ok(false)
    }

    /// Reconcile the current registration. Returns `None` when not
    /// registered.
    pub async fn check(&self) -> AppResult<Option<bool>> {
        let current = self.state().await;
        match current {
            FencingState::Registered { account_id, token } => {
                self.reconcile(account_id, token).await.map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Refresh the last-active time of the current registration without
    /// re-registering.
    pub async fn touch(&self) -> AppResult<()> {
        let current = self.state().await;
        if let FencingState::Registered { account_id, .. } = current {
            self.touch_row(&account_id.to_string()).await?;
            debug!(account = %account_id, "Session touched");
        }
        Ok(())
    }

    /// Register and start the reconciliation ticker. A failed registration
    /// is retried on every tick until it succeeds.
    pub async fn start(&self, account_id: AccountId, token: SessionToken, device: DeviceDescriptor) {
        self.stop_ticker().await;
        let epoch = {
            let _state = self.inner.state.lock().await;
            self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        let registered = match self.register_in(epoch, account_id, token, device.clone()).await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(account = %account_id, error = %e, "Session registration failed, will retry");
                false
            }
        };

        let cancel = CancellationToken::new();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(run_ticker(
            weak,
            cancel.clone(),
            epoch,
            account_id,
            token,
            device,
            registered,
        ));
        *self.inner.ticker.lock().await = Some(Ticker { cancel, task });
    }

    /// Stop polling. An evicted state is kept so it can be inspected; any
    /// other state returns to `Unregistered`.
    ///
    /// A ticker write still in flight when this returns is discarded.
    pub async fn stop(&self) {
        self.stop_ticker().await;
        let mut state = self.inner.state.lock().await;
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if !matches!(*state, FencingState::Evicted { .. }) {
            *state = FencingState::Unregistered;
        }
    }

    /// Whether a reconciliation ticker is running.
    pub async fn is_polling(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.task.is_finished())
    }

    async fn holds(&self, account_id: AccountId, token: SessionToken) -> bool {
        *self.inner.state.lock().await == FencingState::Registered { account_id, token }
    }

    async fn stop_ticker(&self) {
        let ticker = self.inner.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            // An evicting ticker is the one signing out; let it finish the
            // notice. Anything else is aborted so in-flight writes never land.
            let evicting = matches!(*self.inner.state.lock().await, FencingState::Evicted { .. });
            if !evicting {
                ticker.task.abort();
            }
        }
    }

    async fn touch_row(&self, key: &str) -> AppResult<bool> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let patch = Record::new().with(SessionRecord::LAST_ACTIVE_FIELD, now);
        self.inner
            .store
            .update(
                &self.inner.config.table,
                SessionRecord::KEY_FIELD,
                key,
                patch,
            )
            .await
    }

    /// Transition `Registered{account_id, token}` to `Evicted` and sign out.
    /// Any other state means someone already handled it.
    async fn evict(&self, account_id: AccountId, token: SessionToken) {
        {
            let mut state = self.inner.state.lock().await;
            let ours = FencingState::Registered { account_id, token };
            if *state != ours {
                debug!(account = %account_id, state = state.as_str(), "Eviction already handled");
                return;
            }
            *state = FencingState::Evicted { account_id };
        }

        let evicted = AppError::session_evicted(format!(
            "Account {account_id} was registered by a newer session"
        ));
        info!(account = %account_id, error = %evicted, "Signing out");
        if let Err(e) = self.inner.auth.sign_out().await {
            error!(account = %account_id, error = %e, "Forced sign-out failed");
        }
        if let Some(notice) = Notice::from_error(&evicted) {
            self.inner.notifier.notify(notice);
        }
    }
}

async fn run_ticker(
    weak: Weak<Inner>,
    cancel: CancellationToken,
    epoch: u64,
    account_id: AccountId,
    token: SessionToken,
    device: DeviceDescriptor,
    mut registered: bool,
) {
    let period = match weak.upgrade() {
        Some(inner) => inner.config.poll_interval(),
        None => return,
    };
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(inner) = weak.upgrade() else { break };
        if inner.epoch.load(Ordering::SeqCst) != epoch {
            break;
        }
        let monitor = SessionFencingMonitor { inner };

        if !registered {
            match monitor.register_in(epoch, account_id, token, device.clone()).await {
                Ok(true) => registered = true,
                Ok(false) => break,
                Err(e) => warn!(account = %account_id, error = %e, "Session registration retry failed"),
            }
            continue;
        }

        match monitor.reconcile(account_id, token).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => warn!(account = %account_id, error = %e, "Session reconciliation failed, retrying next tick"),
        }
    }

    debug!(account = %account_id, "Session ticker stopped");
}
