//! Notification surfaces for engine notices.

pub mod dedup;
pub mod recording;
pub mod tracing_notifier;

pub use dedup::DedupNotifier;
pub use recording::RecordingNotifier;
pub use tracing_notifier::TracingNotifier;
