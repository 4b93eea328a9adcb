//! Notifier that keeps every notice in memory.

use std::mem;
use std::sync::Mutex;

use livesync_core::traits::Notifier;
use livesync_core::types::{Notice, NoticeKind};

/// Records notices in delivery order. Hosts use it to drain notices into
/// their own UI; tests use it to assert on them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove and return all notices so far.
    pub fn drain(&self) -> Vec<Notice> {
        mem::take(&mut *self.notices.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Number of notices of the same kind as `kind`, ignoring payloads.
    pub fn count(&self, kind: &NoticeKind) -> usize {
        let wanted = mem::discriminant(kind);
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|n| mem::discriminant(&n.kind) == wanted)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notice);
    }
}
