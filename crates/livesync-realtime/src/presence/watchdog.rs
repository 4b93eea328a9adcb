//! Inactivity watchdog: signs the user out after a period without activity.
//!
//! The watchdog owns exactly two timers (warning and logout) and an optional
//! debounce task. All of them live behind one async mutex together with an
//! arm generation. Every timer task re-checks the generation under the lock
//! before acting, so a task scheduled before `disarm()` or a re-arm never
//! mutates state afterwards even if it was already past its sleep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace};

use livesync_core::config::watchdog::WatchdogConfig;
use livesync_core::traits::{AuthProvider, Notifier};
use livesync_core::types::Notice;

use super::activity::{ActivityKind, ActivityThrottle};

/// The warning and logout timers. Arming always cancels both first.
#[derive(Debug, Default)]
struct TimerPair {
    warning: Option<JoinHandle<()>>,
    logout: Option<JoinHandle<()>>,
}

impl TimerPair {
    fn cancel_all(&mut self) {
        if let Some(handle) = self.warning.take() {
            handle.abort();
        }
        if let Some(handle) = self.logout.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct WatchdogState {
    /// Armed timeout; `None` while disarmed.
    timeout: Option<Duration>,
    /// Bumped on every arm, disarm and logout.
    generation: u64,
    timers: TimerPair,
    debounce: Option<JoinHandle<()>>,
    throttle: ActivityThrottle,
}

impl WatchdogState {
    fn cancel_everything(&mut self) {
        self.timers.cancel_all();
        if let Some(handle) = self.debounce.take() {
            handle.abort();
        }
    }
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogStats {
    /// Activity signals that passed the whitelist and throttle.
    pub accepted: u64,
    /// Signals dropped (not whitelisted, throttled, or disarmed).
    pub ignored: u64,
    /// Timer resets performed after debounce.
    pub resets: u64,
    /// Warning notices raised.
    pub warnings: u64,
    /// Inactivity logouts performed.
    pub logouts: u64,
}

#[derive(Debug, Default)]
struct WatchdogCounters {
    accepted: AtomicU64,
    ignored: AtomicU64,
    resets: AtomicU64,
    warnings: AtomicU64,
    logouts: AtomicU64,
}

impl WatchdogCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WatchdogStats {
        WatchdogStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            logouts: self.logouts.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: WatchdogConfig,
    auth: Arc<dyn AuthProvider>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<WatchdogState>,
    counters: WatchdogCounters,
}

/// Client-side inactivity timer. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct InactivityWatchdog {
    inner: Arc<Inner>,
}

impl InactivityWatchdog {
    /// Create a disarmed watchdog.
    pub fn new(
        config: WatchdogConfig,
        auth: Arc<dyn AuthProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let throttle = ActivityThrottle::new(config.throttle());
        Self {
            inner: Arc::new(Inner {
                config,
                auth,
                notifier,
                state: Mutex::new(WatchdogState {
                    timeout: None,
                    generation: 0,
                    timers: TimerPair::default(),
                    debounce: None,
                    throttle,
                }),
                counters: WatchdogCounters::default(),
            }),
        }
    }

    /// Arm with the configured timeout.
    pub async fn arm_default(&self) {
        self.arm(self.inner.config.timeout()).await;
    }

    /// Arm (or re-arm) with `timeout`: logout fires after `timeout`, and a
    /// warning fires `warning_lead` earlier when that is still positive.
    pub async fn arm(&self, timeout: Duration) {
        let mut state = self.inner.state.lock().await;
        state.cancel_everything();
        state.throttle.reset();
        state.generation += 1;
        state.timeout = Some(timeout);
        Inner::schedule(&self.inner, &mut state, timeout);
        info!(
            timeout_ms = timeout.as_millis() as u64,
            generation = state.generation,
            "Inactivity watchdog armed"
        );
    }

    /// Report an activity signal. Returns whether it was accepted; an
    /// accepted signal resets both timers after the debounce delay.
    pub async fn on_activity(&self, kind: ActivityKind) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.timeout.is_none() || !state.throttle.accept(Instant::now()) {
            WatchdogCounters::bump(&self.inner.counters.ignored);
            trace!(kind = %kind, "Activity ignored");
            return false;
        }
        WatchdogCounters::bump(&self.inner.counters.accepted);

        if let Some(previous) = state.debounce.take() {
            previous.abort();
        }
        let generation = state.generation;
        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.config.debounce();
        state.debounce = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            Inner::on_debounce_elapsed(weak, generation).await;
        }));
        trace!(kind = %kind, "Activity accepted");
        true
    }

    /// Report a raw host event name. Names outside the whitelist are
    /// ignored.
    pub async fn on_raw_activity(&self, name: &str) -> bool {
        match ActivityKind::parse(name) {
            Some(kind) => self.on_activity(kind).await,
            None => {
                WatchdogCounters::bump(&self.inner.counters.ignored);
                trace!(name, "Activity kind not whitelisted");
                false
            }
        }
    }

    /// Cancel all timers. Idempotent.
    pub async fn disarm(&self) {
        let mut state = self.inner.state.lock().await;
        let was_armed = state.timeout.take().is_some();
        state.cancel_everything();
        state.throttle.reset();
        state.generation += 1;
        if was_armed {
            info!("Inactivity watchdog disarmed");
        }
    }

    /// Whether the watchdog is currently armed.
    pub async fn is_armed(&self) -> bool {
        self.inner.state.lock().await.timeout.is_some()
    }

    /// Diagnostics counters.
    pub fn stats(&self) -> WatchdogStats {
        self.inner.counters.snapshot()
    }
}

impl Inner {
    /// Spawn the timer pair for the current generation. Caller holds the
    /// state lock and has cancelled the previous pair.
    fn schedule(this: &Arc<Self>, state: &mut WatchdogState, timeout: Duration) {
        let generation = state.generation;
        let lead = this.config.warning_lead();

        if timeout > lead {
            let weak = Arc::downgrade(this);
            let at = timeout - lead;
            state.timers.warning = Some(tokio::spawn(async move {
                time::sleep(at).await;
                Inner::on_warning_elapsed(weak, generation, lead).await;
            }));
        }

        let weak = Arc::downgrade(this);
        state.timers.logout = Some(tokio::spawn(async move {
            time::sleep(timeout).await;
            Inner::on_logout_elapsed(weak, generation).await;
        }));
    }

    async fn on_debounce_elapsed(weak: Weak<Self>, generation: u64) {
        let Some(this) = weak.upgrade() else { return };
        let mut state = this.state.lock().await;
        if state.generation != generation {
            return;
        }
        // Drop our own handle without aborting ourselves.
        state.debounce.take();
        let Some(timeout) = state.timeout else { return };
        state.timers.cancel_all();
        Self::schedule(&this, &mut state, timeout);
        WatchdogCounters::bump(&this.counters.resets);
        debug!(generation, "Inactivity timers reset");
    }

    async fn on_warning_elapsed(weak: Weak<Self>, generation: u64, remaining: Duration) {
        let Some(this) = weak.upgrade() else { return };
        {
            let mut state = this.state.lock().await;
            if state.generation != generation || state.timeout.is_none() {
                return;
            }
            state.timers.warning.take();
        }
        WatchdogCounters::bump(&this.counters.warnings);
        info!(
            remaining_ms = remaining.as_millis() as u64,
            "Inactivity warning raised"
        );
        this.notifier.notify(Notice::inactivity_warning(remaining));
    }

    async fn on_logout_elapsed(weak: Weak<Self>, generation: u64) {
        let Some(this) = weak.upgrade() else { return };
        {
            let mut state = this.state.lock().await;
            if state.generation != generation || state.timeout.is_none() {
                return;
            }
            state.timers.logout.take();
            state.cancel_everything();
            state.timeout = None;
            state.generation += 1;
        }

        WatchdogCounters::bump(&this.counters.logouts);
        info!("Signing out after inactivity");
        if let Err(e) = this.auth.sign_out().await {
            error!(error = %e, "Inactivity sign-out failed");
        }
        this.notifier.notify(Notice::inactivity_logout());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryAuth;
    use crate::notification::RecordingNotifier;
    use livesync_core::types::NoticeKind;

    const WARNING: NoticeKind = NoticeKind::InactivityWarning { remaining_ms: 0 };

    fn watchdog() -> (InactivityWatchdog, Arc<MemoryAuth>, Arc<RecordingNotifier>) {
        let auth = Arc::new(MemoryAuth::new(16));
        let notifier = Arc::new(RecordingNotifier::new());
        let watchdog =
            InactivityWatchdog::new(WatchdogConfig::default(), auth.clone(), notifier.clone());
        (watchdog, auth, notifier)
    }

    async fn advance(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_after_timeout() {
        let (watchdog, auth, notifier) = watchdog();
        watchdog.arm(Duration::from_millis(5_000)).await;

        advance(4_900).await;
        assert_eq!(auth.sign_out_count(), 0);

        advance(200).await;
        assert_eq!(auth.sign_out_count(), 1);
        assert_eq!(notifier.count(&NoticeKind::InactivityLogout), 1);
        assert!(!watchdog.is_armed().await);
        assert_eq!(watchdog.stats().logouts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_prevents_logout() {
        let (watchdog, auth, notifier) = watchdog();
        watchdog.arm(Duration::from_millis(5_000)).await;

        advance(4_000).await;
        watchdog.disarm().await;
        advance(2_000).await;

        assert_eq!(auth.sign_out_count(), 0);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_is_idempotent() {
        let (watchdog, auth, _) = watchdog();
        watchdog.disarm().await;
        watchdog.arm(Duration::from_millis(1_000)).await;
        watchdog.disarm().await;
        watchdog.disarm().await;
        advance(2_000).await;
        assert_eq!(auth.sign_out_count(), 0);
        assert!(!watchdog.is_armed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_timeout_never_warns() {
        let (watchdog, auth, notifier) = watchdog();
        watchdog.arm(Duration::from_millis(10_000)).await;

        advance(10_100).await;
        assert_eq!(notifier.count(&WARNING), 0);
        assert_eq!(auth.sign_out_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_fires_lead_before_logout() {
        let (watchdog, auth, notifier) = watchdog();
        watchdog.arm(Duration::from_millis(60_000)).await;

        advance(29_900).await;
        assert_eq!(notifier.count(&WARNING), 0);

        advance(200).await;
        assert_eq!(notifier.count(&WARNING), 1);
        assert_eq!(
            notifier.notices()[0].kind,
            NoticeKind::InactivityWarning {
                remaining_ms: 30_000
            }
        );
        assert_eq!(auth.sign_out_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_within_window_resets_once() {
        let (watchdog, _, _) = watchdog();
        watchdog.arm(Duration::from_millis(60_000)).await;

        assert!(watchdog.on_activity(ActivityKind::Click).await);
        advance(999).await;
        assert!(!watchdog.on_activity(ActivityKind::Click).await);
        advance(500).await;

        assert_eq!(watchdog.stats().resets, 1);
        assert_eq!(watchdog.stats().ignored, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_after_window_resets_twice() {
        let (watchdog, _, _) = watchdog();
        watchdog.arm(Duration::from_millis(60_000)).await;

        assert!(watchdog.on_activity(ActivityKind::Click).await);
        advance(1_001).await;
        assert!(watchdog.on_activity(ActivityKind::Scroll).await);
        advance(500).await;

        assert_eq!(watchdog.stats().resets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_postpones_logout() {
        let (watchdog, auth, _) = watchdog();
        watchdog.arm(Duration::from_millis(5_000)).await;

        advance(4_000).await;
        assert!(watchdog.on_activity(ActivityKind::KeyPress).await);
        advance(2_000).await;
        assert_eq!(auth.sign_out_count(), 0);

        advance(3_500).await;
        assert_eq!(auth.sign_out_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_disarmed_activity_ignored() {
        let (watchdog, _, _) = watchdog();
        assert!(!watchdog.on_activity(ActivityKind::Click).await);
        watchdog.arm(Duration::from_millis(5_000)).await;
        assert!(!watchdog.on_raw_activity("mousemove").await);
        assert!(watchdog.on_raw_activity("pointerdown").await);
        assert_eq!(watchdog.stats().ignored, 2);
        assert_eq!(watchdog.stats().accepted, 1);
    }
}
