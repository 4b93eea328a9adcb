//! Connection state as seen by consumers of a feed subscription.

pub mod status;

pub use status::{ConnectionSnapshot, ConnectionStateTracker, ConnectionStatus, ConnectionWatch};
