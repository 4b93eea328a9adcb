//! Integration tests for single-active-session fencing.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use livesync_core::config::EngineConfig;
use livesync_core::types::{AccountId, NoticeKind};
use livesync_realtime::FencingState;
use livesync_realtime::bridge::MemoryStore;

use helpers::{TestDevice, settle};

#[tokio::test(start_paused = true)]
async fn test_second_device_evicts_first_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let laptop = TestDevice::with_store(store.clone(), EngineConfig::default());
    let phone = TestDevice::with_store(store.clone(), EngineConfig::default());
    let account = AccountId::new();

    laptop.start_signed_in(account, "web").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    phone.start_signed_in(account, "ios").await;
    assert_eq!(store.rows("user_sessions").len(), 1);

    // Laptop's first tick is 60 s after its registration.
    tokio::time::sleep(Duration::from_secs(56)).await;
    assert_eq!(laptop.auth.sign_out_count(), 1);
    assert_eq!(laptop.notifier.count(&NoticeKind::SignedOutElsewhere), 1);
    assert!(matches!(
        laptop.engine.fencing().state().await,
        FencingState::Evicted { .. }
    ));
    assert!(!laptop.engine.watchdog().is_armed().await);

    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(laptop.auth.sign_out_count(), 1);
    assert_eq!(laptop.notifier.count(&NoticeKind::SignedOutElsewhere), 1);
    assert_eq!(phone.auth.sign_out_count(), 0);
    assert_eq!(phone.notifier.count(&NoticeKind::SignedOutElsewhere), 0);

    laptop.engine.shutdown().await.unwrap();
    phone.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_token_refresh_does_not_reregister() {
    let device = TestDevice::new();
    let account = AccountId::new();
    device.start_signed_in(account, "web").await;
    let before = device.engine.fencing().state().await;

    device.auth.refresh().await;
    settle().await;

    assert_eq!(device.engine.fencing().state().await, before);
    assert_eq!(device.store.rows("user_sessions").len(), 1);
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_does_not_evict() {
    let device = TestDevice::new();
    let account = AccountId::new();
    device.start_signed_in(account, "web").await;

    device.store.fail_next_reads(2);
    tokio::time::sleep(Duration::from_secs(185)).await;

    assert_eq!(device.auth.sign_out_count(), 0);
    assert!(matches!(
        device.engine.fencing().state().await,
        FencingState::Registered { .. }
    ));
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_stops_fencing() {
    let device = TestDevice::new();
    device.start_signed_in(AccountId::new(), "web").await;

    livesync_core::traits::AuthProvider::sign_out(device.auth.as_ref())
        .await
        .unwrap();
    settle().await;

    assert_eq!(
        device.engine.fencing().state().await,
        FencingState::Unregistered
    );
    device.engine.shutdown().await.unwrap();
}
