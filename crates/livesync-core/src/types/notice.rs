//! User-visible notices raised by the engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// Presentation level of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

/// What the notice is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoticeKind {
    /// Another device registered for the same account.
    SignedOutElsewhere,
    /// Logout is imminent unless the user interacts.
    InactivityWarning {
        /// Time left before logout.
        remaining_ms: u64,
    },
    /// The watchdog signed the user out.
    InactivityLogout,
    /// A write hit a unique constraint.
    Conflict,
}

/// Fire-and-forget message for the notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Presentation level.
    pub level: NoticeLevel,
    /// Structured kind.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Another session took over this account.
    pub fn signed_out_elsewhere() -> Self {
        Self {
            level: NoticeLevel::Warning,
            kind: NoticeKind::SignedOutElsewhere,
            message: "You have been signed out because your account was used on another device."
                .to_string(),
        }
    }

    /// Logout will happen after `remaining` unless there is activity.
    pub fn inactivity_warning(remaining: Duration) -> Self {
        Self {
            level: NoticeLevel::Warning,
            kind: NoticeKind::InactivityWarning {
                remaining_ms: remaining.as_millis() as u64,
            },
            message: format!(
                "You will be signed out in {} seconds due to inactivity.",
                remaining.as_secs()
            ),
        }
    }

    /// The watchdog signed the user out.
    pub fn inactivity_logout() -> Self {
        Self {
            level: NoticeLevel::Info,
            kind: NoticeKind::InactivityLogout,
            message: "You have been signed out due to inactivity.".to_string(),
        }
    }

    /// Map an error to a user-facing notice. Conflicts and session
    /// evictions are user-facing; everything else is logged by the caller.
    pub fn from_error(err: &AppError) -> Option<Self> {
        match err.kind {
            ErrorKind::Conflict => Some(Self {
                level: NoticeLevel::Warning,
                kind: NoticeKind::Conflict,
                message: err.message.clone(),
            }),
            ErrorKind::SessionEvicted => Some(Self::signed_out_elsewhere()),
            _ => None,
        }
    }
}
