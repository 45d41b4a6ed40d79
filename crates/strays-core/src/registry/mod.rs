//! Per-entity-type rule registry
//!
//! The registry maps each [`EntityKind`] to the [`RuleSet`] of that entity
//! type, so the update pipeline never branches on the concrete entity.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use strays_core::model::{Animal, EntityKind};
//! use strays_core::registry::RuleRegistry;
//!
//! let registry = Arc::new(RuleRegistry::standard().unwrap());
//!
//! assert!(registry.has_rule_set(EntityKind::Animal));
//! let rules = registry.rule_set::<Animal>().unwrap();
//! assert!(rules.get("name").is_some());
//! ```
//!
//! ## Lifecycle
//!
//! Rule sets are registered through `&mut self` while the registry is being
//! built. Once it is wrapped in an `Arc` and shared it is read-only, so no
//! locking is involved.

use std::any::Any;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{Animal, Entity, EntityKind, UserProfile};
use crate::rules::{self, RuleSet};

/// Rule sets for every known entity type
#[derive(Default)]
pub struct RuleRegistry {
    /// `RuleSet<E>` for each `E::KIND`, type-erased
    rule_sets: HashMap<EntityKind, Box<dyn Any + Send + Sync>>,
}

impl RuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in [`Animal`] and [`UserProfile`] rules
    pub fn standard() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(rules::animal::rules()?)?;
        registry.register(rules::user::rules()?)?;
        Ok(registry)
    }

    /// Register the rule set of one entity type
    ///
    /// # Parameters
    ///
    /// - `rules`: Complete rule set for `E`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Registered
    /// - `Err(Error::Config)`: A rule set for `E::KIND` already exists
    pub fn register<E: Entity>(&mut self, rules: RuleSet<E>) -> Result<()> {
        if self.rule_sets.contains_key(&E::KIND) {
            return Err(Error::config(format!(
                "Rule set for {} already registered",
                E::KIND
            )));
        }
        self.rule_sets.insert(E::KIND, Box::new(rules));
        Ok(())
    }

    /// Look up the rule set of `E`
    ///
    /// # Returns
    ///
    /// - `Ok(&RuleSet<E>)`: The registered rules
    /// - `Err(Error::UnknownEntityType)`: Nothing registered for `E::KIND`
    pub fn rule_set<E: Entity>(&self) -> Result<&RuleSet<E>> {
        self.rule_sets
            .get(&E::KIND)
            .and_then(|boxed| boxed.downcast_ref::<RuleSet<E>>())
            .ok_or_else(|| Error::unknown_entity_type(E::KIND.as_str()))
    }

    /// Check if a rule set is registered for `kind`
    pub fn has_rule_set(&self, kind: EntityKind) -> bool {
        self.rule_sets.contains_key(&kind)
    }

    /// List all registered entity types
    pub fn entity_types(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<_> = self.rule_sets.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("entity_types", &self.entity_types())
            .finish()
    }
}
