//! Bounded list reconciler: keeps one watched collection ordered
//! newest-first, unique by primary key and no longer than its capacity.

use tracing::trace;

use livesync_core::events::FeedEvent;
use livesync_core::types::{FeedDescriptor, Record, RecordFilter};

/// What a single `apply` did to the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A record was prepended; `evicted` names the key dropped from the tail.
    Inserted {
        /// Key of the evicted tail element, if capacity was exceeded.
        evicted: Option<String>,
    },
    /// An insert replaced an element that already had its key.
    Replaced,
    /// An element was updated in place.
    Updated,
    /// An element was removed.
    Deleted,
    /// The insert failed the inclusion predicate.
    FilteredOut,
    /// Update or delete for a key that is not in the collection.
    NotPresent,
}

impl ApplyOutcome {
    /// Whether the collection changed.
    pub fn changed(&self) -> bool {
        !matches!(self, Self::FilteredOut | Self::NotPresent)
    }
}

/// Applies feed events to an ordered, capacity-bounded, key-unique list.
///
/// Owned by exactly one subscription task; never shared.
#[derive(Debug, Clone)]
pub struct BoundedListReconciler {
    items: Vec<Record>,
    capacity: usize,
    primary_key: String,
    filter: Option<RecordFilter>,
}

impl BoundedListReconciler {
    /// Creates an empty reconciler for the descriptor.
    pub fn new(descriptor: &FeedDescriptor) -> Self {
        Self {
            items: Vec::with_capacity(descriptor.capacity),
            capacity: descriptor.capacity.max(1),
            primary_key: descriptor.entity.primary_key.clone(),
            filter: descriptor.filter.clone(),
        }
    }

    /// Replace the collection with a snapshot (expected newest-first).
    ///
    /// Rows without a key or failing the predicate are skipped, duplicate
    /// keys keep their first (newest) occurrence, and the result is
    /// truncated to capacity.
    pub fn seed(&mut self, snapshot: Vec<Record>) -> &[Record] {
        self.items.clear();
        for record in snapshot {
            if self.items.len() == self.capacity {
                break;
            }
            let Some(key) = record.key(&self.primary_key) else {
                continue;
            };
            if !self.passes(&record) || self.position(&key).is_some() {
                continue;
            }
            self.items.push(record);
        }
        &self.items
    }

    /// Apply one event and return the updated collection.
    pub fn apply(&mut self, event: FeedEvent) -> &[Record] {
        self.apply_event(event);
        &self.items
    }

    /// Apply one event and report what happened.
    ///
    /// Updates deliberately do not re-evaluate the predicate: an element
    /// that stops matching stays until it is deleted or evicted.
    pub fn apply_event(&mut self, event: FeedEvent) -> ApplyOutcome {
        let outcome = match event {
            FeedEvent::Insert(record) => self.insert(record),
            FeedEvent::Update(record) => self.update(record),
            FeedEvent::Delete { key } => match self.position(&key) {
                Some(idx) => {
                    self.items.remove(idx);
                    ApplyOutcome::Deleted
                }
                None => ApplyOutcome::NotPresent,
            },
        };
        trace!(?outcome, len = self.items.len(), "Applied feed event");
        outcome
    }

    /// Current collection, newest first.
    pub fn items(&self) -> &[Record] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn insert(&mut self, record: Record) -> ApplyOutcome {
        if !self.passes(&record) {
            return ApplyOutcome::FilteredOut;
        }
        let Some(key) = record.key(&self.primary_key) else {
            return ApplyOutcome::FilteredOut;
        };

        if let Some(idx) = self.position(&key) {
            self.items.remove(idx);
            self.items.insert(0, record);
            return ApplyOutcome::Replaced;
        }

        self.items.insert(0, record);
        let evicted = if self.items.len() > self.capacity {
            self.items.pop().and_then(|r| r.key(&self.primary_key))
        } else {
            None
        };
        ApplyOutcome::Inserted { evicted }
    }

    fn update(&mut self, record: Record) -> ApplyOutcome {
        let Some(key) = record.key(&self.primary_key) else {
            return ApplyOutcome::NotPresent;
        };
        match self.position(&key) {
            Some(idx) => {
                self.items[idx] = record;
                ApplyOutcome::Updated
            }
            None => ApplyOutcome::NotPresent,
        }
    }

    fn passes(&self, record: &Record) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(record))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|r| r.key(&self.primary_key).as_deref() == Some(key))
    }
}
