//! Boundary decoding of raw feed events against an entity schema.

use serde_json::Value;

use livesync_core::error::AppError;
use livesync_core::events::{FeedEvent, FeedEventKind, RawFeedEvent};
use livesync_core::types::{EntitySchema, Record};

/// Decodes raw events for one entity type.
#[derive(Debug, Clone)]
pub struct FeedDecoder {
    schema: EntitySchema,
}

impl FeedDecoder {
    /// Creates a decoder for the given schema.
    pub fn new(schema: EntitySchema) -> Self {
        Self { schema }
    }

    /// Validate and decode one event.
    ///
    /// Insert and update need a `new` object carrying the primary key and
    /// every required field. Delete needs an `old` object carrying the key.
    pub fn decode(&self, raw: RawFeedEvent) -> Result<FeedEvent, AppError> {
        match raw.kind {
            FeedEventKind::Insert => self.decode_row(raw.kind, raw.new).map(FeedEvent::Insert),
            FeedEventKind::Update => self.decode_row(raw.kind, raw.new).map(FeedEvent::Update),
            FeedEventKind::Delete => {
                let old = self.object(raw.kind, "old", raw.old)?;
                let key = old.key(&self.schema.primary_key).ok_or_else(|| {
                    AppError::decode(format!(
                        "{} delete on '{}' has no usable '{}'",
                        raw.kind, self.schema.table, self.schema.primary_key
                    ))
                })?;
                Ok(FeedEvent::Delete { key })
            }
        }
    }

    fn decode_row(&self, kind: FeedEventKind, new: Option<Value>) -> Result<Record, AppError> {
        let record = self.object(kind, "new", new)?;

        if record.key(&self.schema.primary_key).is_none() {
            return Err(AppError::decode(format!(
                "{kind} on '{}' has no usable '{}'",
                self.schema.table, self.schema.primary_key
            )));
        }

        if let Some(missing) = self
            .schema
            .required_fields
            .iter()
            .find(|field| !record.contains(field))
        {
            return Err(AppError::decode(format!(
                "{kind} on '{}' is missing required field '{missing}'",
                self.schema.table
            )));
        }

        Ok(record)
    }

    fn object(
        &self,
        kind: FeedEventKind,
        side: &str,
        value: Option<Value>,
    ) -> Result<Record, AppError> {
        let value = value.ok_or_else(|| {
            AppError::decode(format!(
                "{kind} on '{}' carries no '{side}' row",
                self.schema.table
            ))
        })?;
        Record::from_value(value).ok_or_else(|| {
            AppError::decode(format!(
                "{kind} on '{}' has a non-object '{side}' row",
                self.schema.table
            ))
        })
    }
}
