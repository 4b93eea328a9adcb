//! Integration tests for the inactivity watchdog driven through the engine.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use livesync_core::config::EngineConfig;
use livesync_core::types::{AccountId, NoticeKind};
use livesync_realtime::ActivityKind;
use livesync_realtime::bridge::MemoryStore;

use helpers::TestDevice;

fn short_timeout(timeout_ms: u64) -> TestDevice {
    let mut config = EngineConfig::default();
    config.watchdog.timeout_ms = timeout_ms;
    TestDevice::with_store(Arc::new(MemoryStore::new()), config)
}

#[tokio::test(start_paused = true)]
async fn test_idle_session_is_signed_out() {
    let device = short_timeout(5_000);
    device.start_signed_in(AccountId::new(), "web").await;

    tokio::time::sleep(Duration::from_millis(5_200)).await;

    assert_eq!(device.auth.sign_out_count(), 1);
    assert_eq!(device.notifier.count(&NoticeKind::InactivityLogout), 1);
    assert_eq!(
        device
            .notifier
            .count(&NoticeKind::InactivityWarning { remaining_ms: 0 }),
        0
    );
    assert!(!device.engine.watchdog().is_armed().await);
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_sign_out_before_timeout_disarms() {
    let device = short_timeout(5_000);
    device.start_signed_in(AccountId::new(), "web").await;

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    livesync_core::traits::AuthProvider::sign_out(device.auth.as_ref())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    assert_eq!(device.auth.sign_out_count(), 1);
    assert_eq!(device.notifier.count(&NoticeKind::InactivityLogout), 0);
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_session_alive() {
    let device = short_timeout(60_000);
    device.start_signed_in(AccountId::new(), "web").await;

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(device.engine.record_activity(ActivityKind::Click).await);
    }
    assert_eq!(device.auth.sign_out_count(), 0);
    assert_eq!(
        device
            .notifier
            .count(&NoticeKind::InactivityWarning { remaining_ms: 0 }),
        0
    );

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(
        device
            .notifier
            .count(&NoticeKind::InactivityWarning { remaining_ms: 0 }),
        1
    );
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unlisted_input_does_not_count() {
    let device = short_timeout(5_000);
    device.start_signed_in(AccountId::new(), "web").await;

    tokio::time::sleep(Duration::from_millis(4_000)).await;
    assert!(!device.engine.record_raw_activity("mousemove").await);
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert_eq!(device.auth.sign_out_count(), 1);
    device.engine.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_activity_before_sign_in_is_ignored() {
    let device = short_timeout(5_000);
    device.engine.start().await.unwrap();
    assert!(!device.engine.record_activity(ActivityKind::KeyPress).await);
    assert_eq!(device.engine.watchdog().stats().ignored, 1);
    device.engine.shutdown().await.unwrap();
}
