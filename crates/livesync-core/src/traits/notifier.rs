//! Notification surface trait.

use crate::types::notice::Notice;

/// Fire-and-forget presentation of notices. Implementations must not block.
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Present a notice.
    fn notify(&self, notice: Notice);
}
