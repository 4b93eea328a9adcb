//! User presence: activity signals and the inactivity watchdog.

pub mod activity;
pub mod watchdog;

pub use activity::{ActivityKind, ActivityThrottle};
pub use watchdog::{InactivityWatchdog, WatchdogStats};
