//! Core type definitions used across the livesync workspace.

pub mod descriptor;
pub mod filter;
pub mod id;
pub mod notice;
pub mod record;
pub mod session;

pub use descriptor::{EntitySchema, FeedDescriptor, FeedTopic};
pub use filter::{FilterField, FilterOp, FilterValue, RecordFilter};
pub use id::*;
pub use notice::{Notice, NoticeKind, NoticeLevel};
pub use record::Record;
pub use session::{AuthSession, DeviceDescriptor, SessionRecord};
