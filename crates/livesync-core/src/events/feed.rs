//! Change feed events: the logical wire schema and its decoded form.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::record::Record;

/// Mutation kind as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEventKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl fmt::Display for FeedEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A change event exactly as delivered: `{ kind, new, old }`.
///
/// Nothing about the payloads is trusted until decoded against the
/// subscription's entity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeedEvent {
    /// Mutation kind.
    pub kind: FeedEventKind,
    /// New row image (insert/update).
    #[serde(default)]
    pub new: Option<Value>,
    /// Old row image (delete); may contain only the key.
    #[serde(default)]
    pub old: Option<Value>,
}

impl RawFeedEvent {
    /// Insert carrying `record`.
    pub fn insert(record: Record) -> Self {
        Self {
            kind: FeedEventKind::Insert,
            new: Some(record.into_value()),
            old: None,
        }
    }

    /// Update carrying `record`.
    pub fn update(record: Record) -> Self {
        Self {
            kind: FeedEventKind::Update,
            new: Some(record.into_value()),
            old: None,
        }
    }

    /// Delete carrying the old row image.
    pub fn delete(old: Record) -> Self {
        Self {
            kind: FeedEventKind::Delete,
            new: None,
            old: Some(old.into_value()),
        }
    }
}

/// A decoded, schema-checked change event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Prepend if the predicate holds.
    Insert(Record),
    /// Replace the element with the same key.
    Update(Record),
    /// Remove the element with this key.
    Delete {
        /// Primary key of the deleted row.
        key: String,
    },
}

impl FeedEvent {
    /// Wire kind of this event.
    pub fn kind(&self) -> FeedEventKind {
        match self {
            Self::Insert(_) => FeedEventKind::Insert,
            Self::Update(_) => FeedEventKind::Update,
            Self::Delete { .. } => FeedEventKind::Delete,
        }
    }
}

/// Out-of-band status reported by the transport for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// The subscription was acknowledged.
    Subscribed,
    /// The channel was closed.
    Closed,
    /// The channel errored; the transport will retry.
    ChannelError {
        /// Transport-provided reason.
        reason: String,
    },
    /// The join timed out; the transport will retry.
    TimedOut,
}

/// One item on a channel's ordered queue.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// A row change.
    Event(RawFeedEvent),
    /// A status transition.
    Status(ChannelStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_event_parses_logical_schema() {
        let raw: RawFeedEvent = serde_json::from_value(json!({
            "kind": "delete",
            "new": null,
            "old": {"id": "a"}
        }))
        .unwrap();
        assert_eq!(raw.kind, FeedEventKind::Delete);
        assert!(raw.new.is_none());
        assert_eq!(raw.old, Some(json!({"id": "a"})));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let parsed = serde_json::from_value::<RawFeedEvent>(json!({"kind": "truncate"}));
        assert!(parsed.is_err());
    }
}
