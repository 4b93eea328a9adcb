//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use livesync_core::config::EngineConfig;
use livesync_core::types::{AccountId, AuthSession, DeviceDescriptor, Record};
use livesync_realtime::SyncEngine;
use livesync_realtime::bridge::{MemoryAuth, MemoryChangeFeed, MemoryStore};
use livesync_realtime::feed::SubscriptionHandle;
use livesync_realtime::notification::RecordingNotifier;

/// One client instance wired to in-memory collaborators.
pub struct TestDevice {
    /// The engine under test
    pub engine: SyncEngine,
    /// Change feed this device listens to
    pub feed: Arc<MemoryChangeFeed>,
    /// Durable store, possibly shared with other devices
    pub store: Arc<MemoryStore>,
    /// Auth collaborator of this device
    pub auth: Arc<MemoryAuth>,
    /// Notices raised on this device
    pub notifier: Arc<RecordingNotifier>,
}

impl TestDevice {
    /// Create a device with default configuration and its own store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), EngineConfig::default())
    }

    /// Create a device sharing `store`
    pub fn with_store(store: Arc<MemoryStore>, config: EngineConfig) -> Self {
        let feed = Arc::new(MemoryChangeFeed::new(config.feed.queue_buffer_size));
        let auth = Arc::new(MemoryAuth::new(64));
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = SyncEngine::new(
            config,
            feed.clone(),
            store.clone(),
            auth.clone(),
            notifier.clone(),
        );
        Self {
            engine,
            feed,
            store,
            auth,
            notifier,
        }
    }

    /// Start the engine and sign `account_id` in on this device
    pub async fn start_signed_in(&self, account_id: AccountId, platform: &str) {
        self.engine.start().await.expect("engine start");
        self.auth
            .sign_in(AuthSession {
                account_id,
                device: DeviceDescriptor::new(platform),
            })
            .await;
        settle().await;
    }
}

/// Let spawned tasks process queued work.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Wait until the collection has `len` entries.
pub async fn wait_for_len(handle: &SubscriptionHandle, len: usize) {
    let mut rx = handle.watch_collection();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|c| c.len() == len))
        .await
        .expect("collection did not reach expected length")
        .expect("subscription task ended");
}

/// Keys of the current collection, in order.
pub fn keys(handle: &SubscriptionHandle) -> Vec<String> {
    handle
        .collection()
        .iter()
        .filter_map(|r| r.key("id"))
        .collect()
}

/// A transaction row.
pub fn tx(id: &str, token: &str, created_at: i64) -> Record {
    Record::new()
        .with("id", id)
        .with("token", token)
        .with("amount", 100)
        .with("created_at", created_at)
}

