//! In-memory durable store.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use livesync_core::error::AppError;
use livesync_core::result::AppResult;
use livesync_core::traits::{DurableStore, SnapshotQuery};
use livesync_core::types::Record;

/// In-memory store keeping rows per table in insertion order.
///
/// Upserts are atomic per row: the table entry is locked for the duration
/// of the replace, which is the only atomicity the engine relies on.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Table name → rows.
    tables: DashMap<String, Vec<Record>>,
    /// Number of upcoming reads that should fail.
    failing_reads: AtomicUsize,
    /// Number of upcoming writes that should fail.
    failing_writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row without conflict handling.
    pub fn insert_row(&self, table: &str, row: Record) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }

    /// All rows of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    /// Make the next `n` reads fail.
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn check(counter: &AtomicUsize, op: &str) -> AppResult<()> {
        let failing = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::store(format!("Simulated {op} failure")));
        }
        Ok(())
    }
}

/// Descending order by `field`; rows without the field sort last.
fn newest_first(a: &Record, b: &Record, field: &str) -> CmpOrdering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => y
            .as_f64()
            .partial_cmp(&x.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => y.cmp(x),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn select_one(
        &self,
        table: &str,
        key_field: &str,
        key: &str,
    ) -> AppResult<Option<Record>> {
        Self::check(&self.failing_reads, "read")?;
        Ok(self.tables.get(table).and_then(|rows| {
            rows.iter()
                .find(|r| r.key(key_field).as_deref() == Some(key))
                .cloned()
        }))
    }

    async fn select_recent(&self, query: &SnapshotQuery) -> AppResult<Vec<Record>> {
        Self::check(&self.failing_reads, "read")?;
        let mut rows: Vec<Record> = self
            .tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| query.filter.as_ref().is_none_or(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| newest_first(a, b, &query.order_by));
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn upsert(&self, table: &str, row: Record, conflict_key: &str) -> AppResult<()> {
        Self::check(&self.failing_writes, "write")?;
        let key = row.key(conflict_key).ok_or_else(|| {
            AppError::validation(format!("Row has no value for conflict key '{conflict_key}'"))
        })?;

        let mut rows = self.tables.entry(table.to_string()).or_default();
        match rows
            .iter()
            .position(|r| r.key(conflict_key).as_deref() == Some(key.as_str()))
        {
            Some(idx) => rows[idx] = row,
            None => rows.push(row),
        }
        debug!(table, key = %key, "Upserted row");
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        key_field: &str,
        key: &str,
        patch: Record,
    ) -> AppResult<bool> {
        Self::check(&self.failing_writes, "write")?;
        let Some(mut rows) = self.tables.get_mut(table) else {
            return Ok(false);
        };
        let Some(row) = rows
            .iter_mut()
            .find(|r| r.key(key_field).as_deref() == Some(key))
        else {
            return Ok(false);
        };
        for (field, value) in patch.as_map() {
            row.set(field.clone(), value.clone());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livesync_core::types::RecordFilter;

    fn row(id: &str, at: i64) -> Record {
        Record::new().with("id", id).with("created_at", at)
    }

    #[tokio::test]
    async fn test_upsert_is_last_writer_wins() {
        let store = MemoryStore::new();
        store
            .upsert("s", Record::new().with("account_id", "a").with("t", 1), "account_id")
            .await
            .unwrap();
        store
            .upsert("s", Record::new().with("account_id", "a").with("t", 2), "account_id")
            .await
            .unwrap();
        let rows = store.rows("s");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("t"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn test_select_recent_orders_filters_and_limits() {
        let store = MemoryStore::new();
        store.insert_row("t", row("a", 1).with("token", "USDC"));
        store.insert_row("t", row("b", 3).with("token", "USDC"));
        store.insert_row("t", row("c", 2).with("token", "ETH"));
        store.insert_row("t", row("d", 4).with("token", "USDC"));

        let rows = store
            .select_recent(&SnapshotQuery {
                table: "t".into(),
                filter: Some(RecordFilter::eq("token", "USDC")),
                order_by: "created_at".into(),
                limit: 2,
            })
            .await
            .unwrap();
        let keys: Vec<_> = rows.iter().filter_map(|r| r.key("id")).collect();
        assert_eq!(keys, vec!["d", "b"]);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryStore::new();
        store.insert_row("t", row("a", 1));
        let updated = store
            .update("t", "id", "a", Record::new().with("created_at", 9))
            .await
            .unwrap();
        assert!(updated);
        assert!(!store.update("t", "id", "zz", Record::new()).await.unwrap());
        assert_eq!(store.rows("t")[0].get("created_at"), Some(&Value::from(9)));
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let store = MemoryStore::new();
        store.fail_next_reads(1);
        assert!(store.select_one("t", "id", "a").await.is_err());
        assert!(store.select_one("t", "id", "a").await.unwrap().is_none());
    }
}
