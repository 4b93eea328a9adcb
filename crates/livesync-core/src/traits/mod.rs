//! Collaborator traits defined in `livesync-core` and implemented by hosts.
//!
//! The engine never talks to a concrete backend; everything it consumes is
//! injected through these traits.

pub mod auth;
pub mod change_feed;
pub mod notifier;
pub mod store;

pub use auth::AuthProvider;
pub use change_feed::{ChangeFeedService, FeedChannel};
pub use notifier::Notifier;
pub use store::{DurableStore, SnapshotQuery};
