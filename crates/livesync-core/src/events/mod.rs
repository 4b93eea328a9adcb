//! Events crossing the engine boundary.
//!
//! Feed events arrive from the change feed service and are consumed by the
//! subscriber; auth events arrive from the auth collaborator and drive the
//! fencing monitor and the inactivity watchdog.

pub mod auth;
pub mod feed;

pub use auth::AuthEvent;
pub use feed::{ChannelStatus, FeedEvent, FeedEventKind, FeedMessage, RawFeedEvent};
