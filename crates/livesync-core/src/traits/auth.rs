//! Auth collaborator trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::events::auth::AuthEvent;
use crate::result::AppResult;
use crate::types::session::AuthSession;

/// Credential owner. The engine only reads sessions, listens for changes
/// and requests sign-out.
#[async_trait]
pub trait AuthProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Current session, if signed in.
    async fn get_session(&self) -> AppResult<Option<AuthSession>>;

    /// Stream of auth state changes.
    fn subscribe_events(&self) -> broadcast::Receiver<AuthEvent>;

    /// End the local session. Emits `SignedOut` to subscribers.
    async fn sign_out(&self) -> AppResult<()>;
}
