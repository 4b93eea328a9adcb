//! In-memory collaborators for single-process hosts and tests.
//!
//! Each one implements a `livesync-core` trait with the same observable
//! semantics the managed backend provides: ordered per-channel delivery,
//! last-writer-wins upserts, and a broadcast auth state stream.

pub mod memory_auth;
pub mod memory_feed;
pub mod memory_store;

pub use memory_auth::MemoryAuth;
pub use memory_feed::MemoryChangeFeed;
pub use memory_store::MemoryStore;
