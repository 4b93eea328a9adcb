//! Session control: fencing against concurrent logins and the reaction to
//! auth state changes.

pub mod fencing;
pub mod lifecycle;

pub use fencing::{FencingState, SessionFencingMonitor};
pub use lifecycle::SessionLifecycle;
