// # Identity Provider Trait
//
// Resolves who is making the current call. Sessions and tokens live outside
// the engine; the coordinator only needs the resulting identity.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model::RequesterId;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the current requester
    ///
    /// # Returns
    ///
    /// - `Ok(RequesterId)`: Authenticated requester
    /// - `Err(Error::Unauthenticated)`: No identity available
    async fn current_requester(&self) -> Result<RequesterId>;
}

/// Identity provider returning a preconfigured requester, or none
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedIdentity(Option<RequesterId>);

impl FixedIdentity {
    pub fn new(requester: RequesterId) -> Self {
        Self(Some(requester))
    }

    /// Provider that never authenticates anyone
    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_requester(&self) -> Result<RequesterId> {
        self.0.ok_or(Error::Unauthenticated)
    }
}
