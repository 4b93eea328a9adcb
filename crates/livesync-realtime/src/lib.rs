//! # livesync-realtime
//!
//! Client-resident realtime engine for livesync. Provides:
//!
//! - Change feed subscriptions that keep bounded, ordered collections live
//! - Connection status tracking per subscription
//! - Single-active-session fencing through a shared session row
//! - An inactivity watchdog with a warning before logout
//! - In-memory collaborators for hosts and tests

pub mod bridge;
pub mod connection;
pub mod engine;
pub mod feed;
pub mod notification;
pub mod presence;
pub mod session_control;

pub use connection::{ConnectionStateTracker, ConnectionStatus, ConnectionWatch};
pub use engine::SyncEngine;
pub use feed::{BoundedListReconciler, ChangeFeedSubscriber, FeedStats, SubscriptionHandle};
pub use presence::{ActivityKind, InactivityWatchdog};
pub use session_control::{FencingState, SessionFencingMonitor};
