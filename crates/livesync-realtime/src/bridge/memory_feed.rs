//! In-memory change feed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use livesync_core::error::AppError;
use livesync_core::events::{ChannelStatus, FeedMessage, RawFeedEvent};
use livesync_core::result::AppResult;
use livesync_core::traits::{ChangeFeedService, FeedChannel};
use livesync_core::types::{ChannelId, FeedTopic};

/// One open channel.
#[derive(Debug)]
struct MemoryChannel {
    table: String,
    sender: mpsc::Sender<FeedMessage>,
}

/// In-memory change feed.
///
/// A new channel starts with `Subscribed` queued, like a live feed once the
/// join is acknowledged. Delivers every event published for a table to every
/// open channel on that table, in publish order. Topic filters are recorded but not applied, so
/// inclusion is decided by the subscriber.
#[derive(Debug)]
pub struct MemoryChangeFeed {
    /// Channel ID → channel.
    channels: DashMap<ChannelId, MemoryChannel>,
    /// Buffer size for channel queues.
    buffer_size: usize,
    /// Number of upcoming `subscribe` calls that should fail.
    failing_subscribes: AtomicUsize,
}

impl MemoryChangeFeed {
    /// Create a new in-memory change feed.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: DashMap::new(),
            buffer_size: buffer_size.max(1),
            failing_subscribes: AtomicUsize::new(0),
        }
    }

    /// Publish a row change to every channel on `table`.
    pub async fn emit(&self, table: &str, event: RawFeedEvent) {
        self.publish(table, FeedMessage::Event(event)).await;
    }

    /// Publish a status transition to every channel on `table`.
    pub async fn emit_status(&self, table: &str, status: ChannelStatus) {
        self.publish(table, FeedMessage::Status(status)).await;
    }

    /// Drop every channel on `table`, ending their streams.
    pub fn close_table(&self, table: &str) {
        self.channels.retain(|_, ch| ch.table != table);
    }

    /// Number of open channels on `table`.
    pub fn subscriber_count(&self, table: &str) -> usize {
        self.channels.iter().filter(|ch| ch.table == table).count()
    }

    /// Wait until at least `count` channels are open on `table`.
    pub async fn wait_for_subscribers(&self, table: &str, count: usize) {
        while self.subscriber_count(table) < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Make the next `n` `subscribe` calls fail with a connection error.
    pub fn fail_next_subscribes(&self, n: usize) {
        self.failing_subscribes.store(n, Ordering::SeqCst);
    }

    async fn publish(&self, table: &str, message: FeedMessage) {
        let senders: Vec<_> = self
            .channels
            .iter()
            .filter(|ch| ch.table == table)
            .map(|ch| ch.sender.clone())
            .collect();

        for sender in senders {
            let _ = sender.send(message.clone()).await;
        }
    }
}

#[async_trait]
impl ChangeFeedService for MemoryChangeFeed {
    async fn subscribe(&self, topic: &FeedTopic) -> AppResult<FeedChannel> {
        let failing = self
            .failing_subscribes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::connection(format!(
                "Channel for '{}' could not be opened",
                topic.table
            )));
        }

        let (sender, messages) = mpsc::channel(self.buffer_size);
        // Fresh channel with capacity >= 1, so this cannot be full.
        let _ = sender.try_send(FeedMessage::Status(ChannelStatus::Subscribed));
        let id = ChannelId::new();
        self.channels.insert(
            id,
            MemoryChannel {
                table: topic.table.clone(),
                sender,
            },
        );
        debug!(channel = %id, table = %topic.table, "Opened in-memory feed channel");
        Ok(FeedChannel { id, messages })
    }

    async fn unsubscribe(&self, id: ChannelId) -> AppResult<()> {
        self.channels.remove(&id);
        Ok(())
    }
}
