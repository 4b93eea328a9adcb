//! Change feed subscriber: snapshot, then one live channel per descriptor.
//!
//! Every subscription runs as a single task that owns its reconciler and
//! connection tracker and drains the channel queue in order, so each event
//! is applied to completion before the next one is looked at.
//!
//! Events emitted between the snapshot read and the channel becoming active
//! are not recovered; there is no watermark between the two.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use livesync_core::config::feed::FeedConfig;
use livesync_core::error::AppError;
use livesync_core::events::{FeedMessage, RawFeedEvent};
use livesync_core::traits::{ChangeFeedService, DurableStore, FeedChannel, SnapshotQuery};
use livesync_core::types::{ChannelId, FeedDescriptor, Record, SubscriptionId};

use crate::connection::ConnectionStateTracker;

use super::decoder::FeedDecoder;
use super::handle::{FeedCounters, SubscriptionHandle};
use super::reconciler::{ApplyOutcome, BoundedListReconciler};

/// Opens feed subscriptions against injected collaborators.
#[derive(Debug, Clone)]
pub struct ChangeFeedSubscriber {
    feed: Arc<dyn ChangeFeedService>,
    store: Arc<dyn DurableStore>,
    config: FeedConfig,
}

impl ChangeFeedSubscriber {
    /// Creates a new subscriber.
    pub fn new(
        feed: Arc<dyn ChangeFeedService>,
        store: Arc<dyn DurableStore>,
        config: FeedConfig,
    ) -> Self {
        Self {
            feed,
            store,
            config,
        }
    }

    /// Seed a watched collection from a snapshot and start live delivery.
    ///
    /// A failed snapshot leaves the collection empty and the status
    /// `Disconnected`; a failed channel open is retried by the task. Only an
    /// invalid descriptor is an error.
    pub async fn subscribe(&self, descriptor: FeedDescriptor) -> Result<SubscriptionHandle, AppError> {
        descriptor.validate()?;

        let id = SubscriptionId::new();
        let tracker = ConnectionStateTracker::new(self.config.flap_window());
        let mut reconciler = BoundedListReconciler::new(&descriptor);

        let query = SnapshotQuery {
            table: descriptor.entity.table.clone(),
            filter: descriptor.filter.clone(),
            order_by: descriptor.order_by.clone(),
            limit: descriptor.capacity,
        };
        match self.store.select_recent(&query).await {
            Ok(rows) => {
                let seeded = reconciler.seed(rows).len();
                debug!(subscription = %id, table = %query.table, seeded, "Seeded collection from snapshot");
            }
            Err(e) => {
                warn!(subscription = %id, table = %query.table, error = %e, "Snapshot fetch failed");
                tracker.mark_failed();
            }
        }

        let (collection_tx, collection_rx) = watch::channel(Arc::new(reconciler.items().to_vec()));
        let connection = tracker.watch();
        let counters = Arc::new(FeedCounters::default());
        let cancel = CancellationToken::new();

        let task = SubscriptionTask {
            id,
            descriptor: descriptor.clone(),
            decoder: FeedDecoder::new(descriptor.entity.clone()),
            reconciler,
            tracker,
            collection: collection_tx,
            counters: Arc::clone(&counters),
            feed: Arc::clone(&self.feed),
            cancel: cancel.clone(),
            config: self.config.clone(),
        };
        let join = tokio::spawn(task.run());

        info!(
            subscription = %id,
            table = %descriptor.entity.table,
            capacity = descriptor.capacity,
            "Subscription started"
        );

        Ok(SubscriptionHandle::new(
            id,
            descriptor,
            collection_rx,
            connection,
            counters,
            cancel,
            join,
        ))
    }

    /// Equivalent to [`SubscriptionHandle::unsubscribe`].
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        handle.unsubscribe().await;
    }
}

/// Why a drained channel stopped.
enum Drained {
    Cancelled,
    StreamEnded,
}

/// State owned by one subscription task.
struct SubscriptionTask {
    id: SubscriptionId,
    descriptor: FeedDescriptor,
    decoder: FeedDecoder,
    reconciler: BoundedListReconciler,
    tracker: ConnectionStateTracker,
    collection: watch::Sender<Arc<Vec<Record>>>,
    counters: Arc<FeedCounters>,
    feed: Arc<dyn ChangeFeedService>,
    cancel: CancellationToken,
    config: FeedConfig,
}

impl SubscriptionTask {
    async fn run(mut self) {
        let topic = self.descriptor.topic();

        loop {
            let opened = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                opened = self.feed.subscribe(&topic) => opened,
            };

            match opened {
                Ok(channel) => {
                    let channel_id = channel.id;
                    let drained = self.drain(channel).await;
                    self.release(channel_id).await;
                    if matches!(drained, Drained::Cancelled) {
                        break;
                    }
                    warn!(subscription = %self.id, channel = %channel_id, "Feed stream ended, re-opening");
                    self.tracker.mark_failed();
                }
                Err(e) => {
                    warn!(subscription = %self.id, table = %topic.table, error = %e, "Failed to open feed channel");
                    self.tracker.mark_failed();
                }
            }

            FeedCounters::bump(&self.counters.reconnects);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reopen_delay()) => {}
            }
        }

        debug!(subscription = %self.id, "Subscription task exited");
    }

    async fn drain(&mut self, mut channel: FeedChannel) -> Drained {
        loop {
            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Drained::Cancelled,
                message = channel.messages.recv() => message,
            };

            match message {
                Some(FeedMessage::Event(raw)) => self.handle_event(raw),
                Some(FeedMessage::Status(status)) => {
                    let status = self.tracker.on_status(&status);
                    debug!(subscription = %self.id, status = status.as_str(), "Channel status");
                }
                None => return Drained::StreamEnded,
            }
        }
    }

    fn handle_event(&mut self, raw: RawFeedEvent) {
        let event = match self.decoder.decode(raw) {
            Ok(event) => event,
            Err(e) => {
                FeedCounters::bump(&self.counters.dropped_malformed);
                warn!(subscription = %self.id, error = %e, "Dropping malformed feed event");
                return;
            }
        };

        FeedCounters::bump(&self.counters.applied);
        let outcome = self.reconciler.apply_event(event);
        if outcome == ApplyOutcome::FilteredOut {
            FeedCounters::bump(&self.counters.filtered_out);
        }
        if outcome.changed() {
            self.collection
                .send_replace(Arc::new(self.reconciler.items().to_vec()));
        }
    }

    async fn release(&self, channel_id: ChannelId) {
        if let Err(e) = self.feed.unsubscribe(channel_id).await {
            warn!(subscription = %self.id, channel = %channel_id, error = %e, "Failed to release feed channel");
        }
    }
}
