//! Authenticated sessions and the per-account fencing row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AccountId, SessionToken};
use super::record::Record;
use crate::error::AppError;

/// Session as reported by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Authenticated account.
    pub account_id: AccountId,
    /// Device this session runs on.
    pub device: DeviceDescriptor,
}

/// Describes the device holding a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Platform name, e.g. `"web"` or `"ios"`.
    pub platform: String,
    /// User agent string, if known.
    pub user_agent: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor for a platform without a user agent.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            user_agent: None,
        }
    }
}

/// The single row per account used for last-writer-wins fencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Account id, the row's unique key.
    pub account_id: AccountId,
    /// Token of the most recent registration.
    pub session_token: SessionToken,
    /// Device of the most recent registration.
    pub device: DeviceDescriptor,
    /// Last time the owning session reported itself alive.
    pub last_active: DateTime<Utc>,
}

impl SessionRecord {
    /// Field holding the conflict key.
    pub const KEY_FIELD: &'static str = "account_id";
    /// Field holding the fencing token.
    pub const TOKEN_FIELD: &'static str = "session_token";
    /// Field holding the last-active timestamp.
    pub const LAST_ACTIVE_FIELD: &'static str = "last_active";

    /// Convert into a store row.
    pub fn to_record(&self) -> Result<Record, AppError> {
        let value = serde_json::to_value(self)?;
        Record::from_value(value)
            .ok_or_else(|| AppError::internal("Session record did not serialize to an object"))
    }

    /// Parse a store row.
    pub fn from_record(record: Record) -> Result<Self, AppError> {
        serde_json::from_value(record.into_value())
            .map_err(|e| AppError::decode(format!("Malformed session row: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_conversion_keeps_fields() {
        let row = SessionRecord {
            account_id: AccountId::new(),
            session_token: SessionToken::new(),
            device: DeviceDescriptor::new("web"),
            last_active: Utc::now(),
        };
        let record = row.to_record().unwrap();
        assert_eq!(
            record.key(SessionRecord::KEY_FIELD),
            Some(row.account_id.to_string())
        );
        assert_eq!(SessionRecord::from_record(record).unwrap(), row);
    }

    #[test]
    fn test_from_record_rejects_missing_token() {
        let record = Record::new().with("account_id", AccountId::new().to_string());
        assert!(SessionRecord::from_record(record).is_err());
    }
}
