//! Integration tests for watched collections.

mod helpers;

use livesync_core::events::{ChannelStatus, RawFeedEvent};
use livesync_core::types::{EntitySchema, FeedDescriptor, RecordFilter};
use livesync_realtime::ConnectionStatus;

use helpers::{TestDevice, keys, tx, wait_for_len};

const TABLE: &str = "transactions";

fn usdc_descriptor(capacity: usize) -> FeedDescriptor {
    FeedDescriptor::new(EntitySchema::new(TABLE).require("token"), capacity)
        .with_filter(RecordFilter::eq("token", "USDC"))
}

#[tokio::test]
async fn test_filtered_insert_is_ignored_and_matching_insert_prepends() {
    let device = TestDevice::new();
    device.store.insert_row(TABLE, tx("t1", "USDC", 1));
    device.store.insert_row(TABLE, tx("t2", "USDC", 2));

    let handle = device.engine.subscribe(usdc_descriptor(20)).await.unwrap();
    assert_eq!(keys(&handle), vec!["t2", "t1"]);
    device.feed.wait_for_subscribers(TABLE, 1).await;

    device
        .feed
        .emit(TABLE, RawFeedEvent::insert(tx("e1", "ETH", 3)))
        .await;
    device
        .feed
        .emit(TABLE, RawFeedEvent::insert(tx("t3", "USDC", 4)))
        .await;
    wait_for_len(&handle, 3).await;

    assert_eq!(keys(&handle), vec!["t3", "t2", "t1"]);
    assert_eq!(handle.stats().filtered_out, 1);
    handle.unsubscribe().await;
}

#[tokio::test]
async fn test_update_out_of_filter_is_retained() {
    let device = TestDevice::new();
    device.store.insert_row(TABLE, tx("t1", "USDC", 1));

    let handle = device.engine.subscribe(usdc_descriptor(20)).await.unwrap();
    device.feed.wait_for_subscribers(TABLE, 1).await;

    device
        .feed
        .emit(TABLE, RawFeedEvent::update(tx("t1", "ETH", 1)))
        .await;
    let mut rx = handle.watch_collection();
    rx.wait_for(|c| c.first().and_then(|r| r.get_str("token")) == Some("ETH"))
        .await
        .unwrap();

    assert_eq!(keys(&handle), vec!["t1"]);
    handle.unsubscribe().await;
}

#[tokio::test]
async fn test_capacity_evicts_oldest() {
    let device = TestDevice::new();
    let handle = device.engine.subscribe(usdc_descriptor(2)).await.unwrap();
    device.feed.wait_for_subscribers(TABLE, 1).await;

    for (n, id) in ["a", "b", "c"].iter().enumerate() {
        device
            .feed
            .emit(TABLE, RawFeedEvent::insert(tx(id, "USDC", n as i64)))
            .await;
    }
    device
        .feed
        .emit(TABLE, RawFeedEvent::delete(tx("b", "USDC", 1)))
        .await;
    let mut rx = handle.watch_collection();
    rx.wait_for(|c| c.len() == 1 && c[0].key("id").as_deref() == Some("c"))
        .await
        .unwrap();

    assert_eq!(keys(&handle), vec!["c"]);
    handle.unsubscribe().await;
}

#[tokio::test]
async fn test_status_follows_channel() {
    let device = TestDevice::new();
    let handle = device.engine.subscribe(usdc_descriptor(20)).await.unwrap();
    device.feed.wait_for_subscribers(TABLE, 1).await;
    let mut connection = handle.connection();

    // A fresh channel reports itself subscribed without any help.
    assert!(connection.wait_for(ConnectionStatus::Connected).await);

    device
        .feed
        .emit_status(TABLE, ChannelStatus::TimedOut)
        .await;
    assert_eq!(
        connection.changed().await,
        Some(ConnectionStatus::Reconnecting)
    );
    assert!(handle.connection().recently_changed());

    handle.unsubscribe().await;
}

#[tokio::test(start_paused = true)]
async fn test_closed_stream_reopens_and_keeps_collection() {
    let device = TestDevice::new();
    device.store.insert_row(TABLE, tx("t1", "USDC", 1));
    let handle = device.engine.subscribe(usdc_descriptor(20)).await.unwrap();
    device.feed.wait_for_subscribers(TABLE, 1).await;

    device.feed.close_table(TABLE);
    helpers::settle().await;
    assert_eq!(handle.status(), ConnectionStatus::Disconnected);
    assert_eq!(keys(&handle), vec!["t1"]);

    device.feed.wait_for_subscribers(TABLE, 1).await;
    assert!(handle.connection().wait_for(ConnectionStatus::Connected).await);
    device
        .feed
        .emit(TABLE, RawFeedEvent::insert(tx("t2", "USDC", 2)))
        .await;
    wait_for_len(&handle, 2).await;
    assert_eq!(handle.stats().reconnects, 1);
    handle.unsubscribe().await;
}

#[tokio::test]
async fn test_dropping_handle_releases_channel() {
    let device = TestDevice::new();
    let handle = device.engine.subscribe(usdc_descriptor(20)).await.unwrap();
    device.feed.wait_for_subscribers(TABLE, 1).await;

    drop(handle);
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while device.feed.subscriber_count(TABLE) > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("channel was not released");
}
