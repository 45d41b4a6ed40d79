//! Field-by-field application of an update request
//!
//! [`UpdateApplier::apply`] runs every (field, value) pair of a request
//! through three gates: a rule must exist, its validator must accept the
//! value, and authorization must pass against the entity as it was before
//! the request. Survivors are written onto a working copy; the original is
//! never touched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{AuthorizationContext, AuthorizationEvaluator};
use crate::model::{Entity, RequesterId};
use crate::rules::RuleSet;
use crate::value::{UpdateRequest, UpdateValue};

/// One applied field, rendered through the field's reader before and after
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: UpdateValue,
    pub new: UpdateValue,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, old: UpdateValue, new: UpdateValue) -> Self {
        Self {
            field: field.into(),
            old,
            new,
        }
    }
}

/// Result of applying one request
#[derive(Debug, Clone)]
pub struct ApplicationOutcome<E> {
    /// Mutated working copy, present iff at least one field applied
    pub updated: Option<E>,
    /// Applied changes, in request key order
    pub applied: Vec<FieldChange>,
    /// Fields dropped by any gate
    pub skipped: usize,
}

impl<E> ApplicationOutcome<E> {
    /// Nothing applied: the caller must neither persist nor notify
    pub fn is_noop(&self) -> bool {
        self.updated.is_none()
    }

    pub fn applied_fields(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().map(|c| c.field.as_str())
    }
}

/// Why a field was dropped. Only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NoRule,
    Invalid,
    Unauthorized,
    Uncoercible,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateApplier {
    evaluator: AuthorizationEvaluator,
}

impl UpdateApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `request` to a copy of `current`
    ///
    /// Gates are evaluated against `current`, so one field's new value can
    /// never unlock another field in the same request. Fields are processed
    /// independently; any failure just skips the field.
    ///
    /// Callers only learn how many fields were skipped, not which or why.
    /// This keeps the contract of the existing clients (a single
    /// "invalid update" answer when nothing applies); surfacing per-field
    /// reasons would be an additive change to [`ApplicationOutcome`].
    pub fn apply<E: Entity>(
        &self,
        current: &E,
        rules: &RuleSet<E>,
        requester: RequesterId,
        request: &UpdateRequest,
    ) -> ApplicationOutcome<E> {
        let ctx = AuthorizationContext::new(requester, current);
        let mut working = current.clone();
        let mut applied = Vec::new();
        let mut skipped = 0;

        for (field, value) in request.iter() {
            match self.apply_field(&ctx, rules, &mut working, field, value) {
                Ok(change) => {
                    debug!("Applied {}.{} = {}", E::KIND, field, change.new);
                    applied.push(change);
                }
                Err(reason) => {
                    debug!("Skipped {}.{}: {:?}", E::KIND, field, reason);
                    skipped += 1;
                }
            }
        }

        ApplicationOutcome {
            updated: (!applied.is_empty()).then_some(working),
            applied,
            skipped,
        }
    }

    fn apply_field<E: Entity>(
        &self,
        ctx: &AuthorizationContext<'_, E>,
        rules: &RuleSet<E>,
        working: &mut E,
        field: &str,
        value: &UpdateValue,
    ) -> Result<FieldChange, SkipReason> {
        let rule = rules.get(field).ok_or(SkipReason::NoRule)?;

        if !rule.validate(value) {
            return Err(SkipReason::Invalid);
        }
        if !self.evaluator.authorize(rule.tier(), ctx, value) {
            return Err(SkipReason::Unauthorized);
        }

        // Write onto a scratch copy so a failed coercion leaves `working` intact
        let old = rule.read(working);
        let mut candidate = working.clone();
        if !rule.write(&mut candidate, value) {
            return Err(SkipReason::Uncoercible);
        }
        let new = rule.read(&candidate);
        *working = candidate;

        Ok(FieldChange::new(field, old, new))
    }
}
