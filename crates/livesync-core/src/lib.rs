//! # livesync-core
//!
//! Core crate for livesync. Contains the collaborator traits, configuration
//! schemas, typed identifiers, records and filters, feed and auth events,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other livesync crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
