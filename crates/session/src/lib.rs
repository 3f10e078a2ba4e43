//! `assist-session`
//!
//! **Responsibility:** client-side session and authorization for the Assist
//! portal.
//!
//! This crate provides:
//! - The session engine (login, logout, privilege resolution, expiry)
//! - The credential service boundary and its HTTP implementation
//! - Authorized HTTP clients carrying the current token
//!
//! UI code reads [`SessionSnapshot`]s and calls `login`/`logout`; it never
//! touches tokens or the persisted user directly.

pub mod client;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod navigation;
pub mod state;

pub use client::{AuthorizedClient, ClientFactory, SessionExpiryHook};
pub use config::{ConfigError, DEFAULT_STORAGE_KEY, PrivilegeRetryPolicy, SessionConfig};
pub use credentials::{CredentialService, HttpCredentialService, ServiceError};
pub use engine::{SessionEngine, SessionParts, messages};
pub use navigation::{Navigator, NoopNavigator};
pub use state::{SessionPhase, SessionSnapshot};
