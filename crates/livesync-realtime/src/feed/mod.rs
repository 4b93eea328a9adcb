//! Change feed subscriptions and the watched collections they maintain.

pub mod decoder;
pub mod handle;
pub mod reconciler;
pub mod subscriber;

pub use decoder::FeedDecoder;
pub use handle::{FeedStats, SubscriptionHandle};
pub use reconciler::{ApplyOutcome, BoundedListReconciler};
pub use subscriber::ChangeFeedSubscriber;
