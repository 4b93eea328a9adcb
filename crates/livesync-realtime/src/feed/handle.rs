//! Consumer-owned handle to one live feed subscription.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use livesync_core::types::{FeedDescriptor, Record, SubscriptionId};

use crate::connection::{ConnectionStatus, ConnectionWatch};

/// Counters kept by a subscription task.
#[derive(Debug, Default)]
pub(crate) struct FeedCounters {
    pub(crate) applied: AtomicU64,
    pub(crate) filtered_out: AtomicU64,
    pub(crate) dropped_malformed: AtomicU64,
    pub(crate) reconnects: AtomicU64,
}

impl FeedCounters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FeedStats {
        FeedStats {
            applied: self.applied.load(Ordering::Relaxed),
            filtered_out: self.filtered_out.load(Ordering::Relaxed),
            dropped_malformed: self.dropped_malformed.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Diagnostic counters for one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedStats {
    /// Decoded events handed to the reconciler.
    pub applied: u64,
    /// Inserts rejected by the inclusion predicate.
    pub filtered_out: u64,
    /// Events dropped at the decoding boundary.
    pub dropped_malformed: u64,
    /// Channels re-opened after the stream ended or failed to open.
    pub reconnects: u64,
}

/// A handle to a single subscription.
///
/// The handle is the only way to reach the subscription: it is returned by
/// [`ChangeFeedSubscriber::subscribe`](super::ChangeFeedSubscriber::subscribe)
/// and dropping it cancels the subscription task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    descriptor: FeedDescriptor,
    collection: watch::Receiver<Arc<Vec<Record>>>,
    connection: ConnectionWatch,
    counters: Arc<FeedCounters>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: SubscriptionId,
        descriptor: FeedDescriptor,
        collection: watch::Receiver<Arc<Vec<Record>>>,
        connection: ConnectionWatch,
        counters: Arc<FeedCounters>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            descriptor,
            collection,
            connection,
            counters,
            cancel,
            task: Mutex::new(Some(task)),
            closed: AtomicBool::new(false),
        }
    }

    /// Subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The descriptor this subscription was created with.
    pub fn descriptor(&self) -> &FeedDescriptor {
        &self.descriptor
    }

    /// Current collection, newest first.
    pub fn collection(&self) -> Arc<Vec<Record>> {
        self.collection.borrow().clone()
    }

    /// Receiver notified whenever the collection changes.
    pub fn watch_collection(&self) -> watch::Receiver<Arc<Vec<Record>>> {
        self.collection.clone()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Connection view, including the "recently changed" signal.
    pub fn connection(&self) -> ConnectionWatch {
        self.connection.clone()
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> FeedStats {
        self.counters.snapshot()
    }

    /// Whether `unsubscribe` has not been called yet.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Stop delivery and release the channel.
    ///
    /// Idempotent. When this returns the subscription task has exited, so no
    /// further mutation of the collection can happen. Failures are logged,
    /// never returned.
    pub async fn unsubscribe(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(subscription = %self.id, error = %e, "Subscription task did not exit cleanly");
            }
        }
        debug!(subscription = %self.id, table = %self.descriptor.entity.table, "Unsubscribed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
