//! Field-level authorization
//!
//! [`AuthorizationEvaluator::authorize`] is a pure, total function of the
//! field's tier, the requester/owner relationship, the pre-update snapshot and
//! the proposed value. It never touches storage and never fails.

use crate::model::{Entity, RequesterId};
use crate::rules::Tier;
use crate::value::UpdateValue;

/// Everything an authorization decision may look at
#[derive(Debug)]
pub struct AuthorizationContext<'a, E> {
    pub requester: RequesterId,
    /// Owner ("primary caretaker") of the entity, if it has one
    pub owner: Option<RequesterId>,
    /// Entity state before any field of the current request was applied
    pub snapshot: &'a E,
}

impl<'a, E: Entity> AuthorizationContext<'a, E> {
    pub fn new(requester: RequesterId, snapshot: &'a E) -> Self {
        Self {
            requester,
            owner: snapshot.owner_id(),
            snapshot,
        }
    }
}

impl<E> AuthorizationContext<'_, E> {
    /// Whether the requester owns the entity; ownerless entities have no owner
    pub fn is_owner(&self) -> bool {
        self.owner == Some(self.requester)
    }
}

/// Decides whether one proposed field change is permitted
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEvaluator;

impl AuthorizationEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Authorize a change
    ///
    /// - `Public`: always
    /// - `Restricted`: requester is the owner
    /// - `Conditional`: the field's predicate says so
    pub fn authorize<E>(
        &self,
        tier: &Tier<E>,
        ctx: &AuthorizationContext<'_, E>,
        value: &UpdateValue,
    ) -> bool {
        match tier {
            Tier::Public => true,
            Tier::Restricted => ctx.is_owner(),
            Tier::Conditional(condition) => condition(ctx, value),
        }
    }
}
