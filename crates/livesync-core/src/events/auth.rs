//! Auth state-change events.

use serde::{Deserialize, Serialize};

use crate::types::session::AuthSession;

/// Emitted by the auth collaborator whenever its session changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A user signed in on this device.
    SignedIn {
        /// The new session.
        session: AuthSession,
    },
    /// The session ended, for any reason.
    SignedOut,
    /// Credentials were refreshed; the session itself is unchanged.
    TokenRefreshed {
        /// The refreshed session.
        session: AuthSession,
    },
}

impl AuthEvent {
    /// Short name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed { .. } => "token_refreshed",
        }
    }
}
