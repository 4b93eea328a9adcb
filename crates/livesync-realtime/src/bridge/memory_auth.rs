//! In-memory auth collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::info;

use livesync_core::events::AuthEvent;
use livesync_core::result::AppResult;
use livesync_core::traits::AuthProvider;
use livesync_core::types::AuthSession;

/// In-memory auth provider that emits events like a hosted auth client.
#[derive(Debug)]
pub struct MemoryAuth {
    /// Current session.
    session: RwLock<Option<AuthSession>>,
    /// Auth state stream.
    events: broadcast::Sender<AuthEvent>,
    /// Number of `sign_out` calls.
    sign_outs: AtomicUsize,
}

impl MemoryAuth {
    /// Create a signed-out provider.
    pub fn new(buffer_size: usize) -> Self {
        let (events, _) = broadcast::channel(buffer_size.max(1));
        Self {
            session: RwLock::new(None),
            events,
            sign_outs: AtomicUsize::new(0),
        }
    }

    /// Sign in and emit `SignedIn`.
    pub async fn sign_in(&self, session: AuthSession) {
        *self.session.write().await = Some(session.clone());
        let _ = self.events.send(AuthEvent::SignedIn { session });
    }

    /// Emit `TokenRefreshed` for the current session, if any.
    pub async fn refresh(&self) {
        if let Some(session) = self.session.read().await.clone() {
            let _ = self.events.send(AuthEvent::TokenRefreshed { session });
        }
    }

    /// How many times `sign_out` has been called.
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn get_session(&self) -> AppResult<Option<AuthSession>> {
        Ok(self.session.read().await.clone())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            info!(account = %session.account_id, "Signed out");
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livesync_core::types::{AccountId, DeviceDescriptor};

    #[tokio::test]
    async fn test_sign_in_and_out_emit_events() {
        let auth = MemoryAuth::new(8);
        let mut events = auth.subscribe_events();
        let session = AuthSession {
            account_id: AccountId::new(),
            device: DeviceDescriptor::new("web"),
        };

        auth.sign_in(session.clone()).await;
        auth.refresh().await;
        auth.sign_out().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::SignedIn {
                session: session.clone()
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            AuthEvent::TokenRefreshed { session }
        );
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
        assert!(auth.get_session().await.unwrap().is_none());
        assert_eq!(auth.sign_out_count(), 1);
    }
}
