//! Subscription descriptors: what a consumer wants to watch.

use serde::{Deserialize, Serialize};

use super::filter::RecordFilter;
use crate::error::AppError;

/// Shape of one entity type as seen at the change feed boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Table (topic) name.
    pub table: String,
    /// Primary key field.
    pub primary_key: String,
    /// Fields every inserted or updated record must carry.
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl EntitySchema {
    /// Schema with an `id` primary key and no other required fields.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            required_fields: Vec::new(),
        }
    }

    /// Add a required field.
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }
}

/// Server-facing part of a descriptor: which rows the channel carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTopic {
    /// Table name.
    pub table: String,
    /// Server-side filter, if any.
    pub filter: Option<RecordFilter>,
}

/// Immutable description of one watched collection.
///
/// Ordering is always most-recent-first by `order_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    /// Entity schema used for decoding.
    pub entity: EntitySchema,
    /// Optional inclusion predicate.
    pub filter: Option<RecordFilter>,
    /// Field used to order the snapshot, newest first.
    pub order_by: String,
    /// Maximum collection length.
    pub capacity: usize,
}

impl FeedDescriptor {
    /// Create a descriptor ordered by `created_at`.
    pub fn new(entity: EntitySchema, capacity: usize) -> Self {
        Self {
            entity,
            filter: None,
            order_by: "created_at".to_string(),
            capacity,
        }
    }

    /// Attach an inclusion predicate.
    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The topic to open on the change feed service.
    pub fn topic(&self) -> FeedTopic {
        FeedTopic {
            table: self.entity.table.clone(),
            filter: self.filter.clone(),
        }
    }

    /// Reject descriptors that could never produce a valid collection.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.capacity == 0 {
            return Err(AppError::validation("Descriptor capacity must be at least 1"));
        }
        validate_name(&self.entity.table, "table")?;
        validate_name(&self.entity.primary_key, "primary key")?;
        validate_name(&self.order_by, "order_by")?;
        Ok(())
    }
}

fn validate_name(name: &str, what: &str) -> Result<(), AppError> {
    if name.is_empty() || name.len() > 63 {
        return Err(AppError::validation(format!("Invalid {what} name length")));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(AppError::validation(format!(
            "{what} name '{name}' contains invalid characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_carries_filter() {
        let d = FeedDescriptor::new(EntitySchema::new("transactions"), 20)
            .with_filter(RecordFilter::eq("token", "USDC"));
        let topic = d.topic();
        assert_eq!(topic.table, "transactions");
        assert_eq!(topic.filter, Some(RecordFilter::eq("token", "USDC")));
    }

    #[test]
    fn test_validate() {
        assert!(FeedDescriptor::new(EntitySchema::new("transactions"), 20).validate().is_ok());
        assert!(FeedDescriptor::new(EntitySchema::new("transactions"), 0).validate().is_err());
        assert!(FeedDescriptor::new(EntitySchema::new("bad table"), 5).validate().is_err());
        assert!(FeedDescriptor::new(EntitySchema::new(""), 5).validate().is_err());
    }
}
