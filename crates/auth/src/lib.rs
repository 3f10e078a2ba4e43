//! `assist-auth`: identity and authorization model for the Assist client.
//!
//! This crate is intentionally decoupled from HTTP and storage: it only
//! describes what the credential service returns and how a coarse role is
//! derived from it.

pub mod access;
pub mod authorize;
pub mod capability;
pub mod credentials;
mod de;
pub mod roles;
pub mod user;

pub use access::Access;
pub use authorize::{AuthzError, CapabilityScope, authorize};
pub use capability::Capability;
pub use credentials::{Credentials, ResponseStatus, ServiceOutcome, ServiceResponse};
pub use roles::Role;
pub use user::User;
