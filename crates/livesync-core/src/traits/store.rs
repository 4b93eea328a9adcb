//! Durable store trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::filter::RecordFilter;
use crate::types::record::Record;

/// Bounded, newest-first snapshot query.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotQuery {
    /// Table to read.
    pub table: String,
    /// Server-side filter.
    pub filter: Option<RecordFilter>,
    /// Field to sort descending by.
    pub order_by: String,
    /// Maximum rows to return.
    pub limit: usize,
}

/// The managed data store, reduced to what the engine needs.
#[async_trait]
pub trait DurableStore: Send + Sync + std::fmt::Debug + 'static {
    /// Point read by key. Returns `None` when no row matches.
    async fn select_one(&self, table: &str, key_field: &str, key: &str)
        -> AppResult<Option<Record>>;

    /// Rows matching the query, newest first, at most `limit`.
    async fn select_recent(&self, query: &SnapshotQuery) -> AppResult<Vec<Record>>;

    /// Insert or replace the row identified by `conflict_key`
    /// (last-writer-wins).
    async fn upsert(&self, table: &str, row: Record, conflict_key: &str) -> AppResult<()>;

    /// Merge `patch` into the row identified by `key`. Returns whether a row
    /// was updated.
    async fn update(&self, table: &str, key_field: &str, key: &str, patch: Record)
        -> AppResult<bool>;
}
