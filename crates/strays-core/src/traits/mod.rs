//! Collaborator traits
//!
//! The update engine never stores or delivers anything itself. It talks to
//! the outside world through these interfaces:
//!
//! - [`PersistenceGateway`]: Fetch and save entities
//! - [`NotificationGateway`]: Record change notifications
//! - [`IdentityProvider`]: Resolve the authenticated requester

pub mod identity_provider;
pub mod notification_gateway;
pub mod persistence_gateway;

pub use identity_provider::{FixedIdentity, IdentityProvider};
pub use notification_gateway::NotificationGateway;
pub use persistence_gateway::PersistenceGateway;
