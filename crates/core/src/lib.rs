//! `assist-core`: shared building blocks for the Assist client.
//!
//! This crate contains identifiers and the error model shared by every other
//! crate (no IO, no async).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{NotificationId, SessionEpoch};
