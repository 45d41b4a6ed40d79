//! Declarative field rules
//!
//! A [`RuleSet`] is the per-entity dispatch table for partial updates. Each
//! updatable field has exactly one [`FieldRule`] holding plain function
//! pointers: a validator, an access tier, a reader and a writer. The whole
//! table is resolved when the rule set is built, so the set of updatable
//! fields for an entity type can be read straight from its `rules()`
//! function.
//!
//! ## Tiers
//!
//! - [`Tier::Public`]: any authenticated requester
//! - [`Tier::Restricted`]: only the entity's owner
//! - [`Tier::Conditional`]: a field-specific predicate decides
//!
//! ## Example
//!
//! ```rust
//! use strays_core::model::Animal;
//! use strays_core::notifier::NotificationContentType;
//! use strays_core::rules::{validators, FieldRule, RuleSet, Tier};
//! use strays_core::UpdateValue;
//!
//! fn write_name(animal: &mut Animal, value: &UpdateValue) -> bool {
//!     match value.as_str() {
//!         Some(name) => {
//!             animal.name = name.trim().to_string();
//!             true
//!         }
//!         None => false,
//!     }
//! }
//!
//! let rules = RuleSet::<Animal>::new(NotificationContentType::AnimalUpdate)
//!     .with(FieldRule::new(
//!         "name",
//!         Tier::Public,
//!         |v| validators::bounded_text(v, 100),
//!         |a: &Animal| UpdateValue::string(a.name.clone()),
//!         write_name,
//!     ))
//!     .unwrap();
//!
//! assert!(rules.get("name").is_some());
//! assert!(rules.get("owner").is_none());
//! ```

pub mod animal;
pub mod user;
pub mod validators;

use std::collections::HashMap;
use std::fmt;

use crate::auth::AuthorizationContext;
use crate::error::{Error, Result};
use crate::model::{Entity, EntityKind, SeverityBand};
use crate::notifier::NotificationContentType;
use crate::value::UpdateValue;

/// Checks the type/format/range of a raw value
pub type Validator = fn(&UpdateValue) -> bool;

/// Predicate for a conditional field, evaluated against the pre-update snapshot
pub type Condition<E> = fn(&AuthorizationContext<'_, E>, &UpdateValue) -> bool;

/// Renders a field's current native value
pub type Reader<E> = fn(&E) -> UpdateValue;

/// Coerces a validated raw value and writes it; `false` if it could not
pub type Writer<E> = fn(&mut E, &UpdateValue) -> bool;

/// Maps a condition value to its severity band
pub type SeverityClassifier = fn(&UpdateValue) -> Option<SeverityBand>;

/// Access-control classification of a field
pub enum Tier<E> {
    Public,
    Restricted,
    Conditional(Condition<E>),
}

impl<E> Tier<E> {
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::Restricted => "restricted",
            Tier::Conditional(_) => "conditional",
        }
    }
}

// Derives would demand `E: Clone`/`E: Debug`; the variants only hold fn pointers.
impl<E> Clone for Tier<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Tier<E> {}

impl<E> fmt::Debug for Tier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How applied changes to a field are announced
#[derive(Debug, Clone, Copy)]
pub enum FieldCategory {
    /// Folded into the single generic update notification
    General,
    /// Condition/health field: one alert per change, prioritized by severity
    Condition {
        content_type: NotificationContentType,
        classify: SeverityClassifier,
    },
}

/// Rule for one updatable field
pub struct FieldRule<E> {
    name: &'static str,
    tier: Tier<E>,
    validate: Validator,
    read: Reader<E>,
    write: Writer<E>,
    category: FieldCategory,
}

impl<E> FieldRule<E> {
    /// Create a rule in the [`FieldCategory::General`] category
    pub fn new(
        name: &'static str,
        tier: Tier<E>,
        validate: Validator,
        read: Reader<E>,
        write: Writer<E>,
    ) -> Self {
        Self {
            name,
            tier,
            validate,
            read,
            write,
            category: FieldCategory::General,
        }
    }

    /// Mark this field as a condition field raising prioritized alerts
    pub fn alerting(
        mut self,
        content_type: NotificationContentType,
        classify: SeverityClassifier,
    ) -> Self {
        self.category = FieldCategory::Condition {
            content_type,
            classify,
        };
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tier(&self) -> &Tier<E> {
        &self.tier
    }

    pub fn category(&self) -> FieldCategory {
        self.category
    }

    pub fn validate(&self, value: &UpdateValue) -> bool {
        (self.validate)(value)
    }

    pub fn read(&self, entity: &E) -> UpdateValue {
        (self.read)(entity)
    }

    pub fn write(&self, entity: &mut E, value: &UpdateValue) -> bool {
        (self.write)(entity, value)
    }
}

impl<E> fmt::Debug for FieldRule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .field("category", &self.category)
            .finish()
    }
}

/// All field rules of one entity type
///
/// Immutable once built. Fields without a rule are not updatable.
pub struct RuleSet<E> {
    kind: EntityKind,
    update_content: NotificationContentType,
    rules: HashMap<&'static str, FieldRule<E>>,
}

impl<E: Entity> RuleSet<E> {
    /// Create an empty rule set
    ///
    /// # Parameters
    ///
    /// - `update_content`: content type of the generic update notification
    ///   emitted for this entity type
    pub fn new(update_content: NotificationContentType) -> Self {
        Self {
            kind: E::KIND,
            update_content,
            rules: HashMap::new(),
        }
    }

    /// Add a rule
    ///
    /// # Errors
    ///
    /// `Error::Config` if a rule for the same field already exists.
    pub fn with(mut self, rule: FieldRule<E>) -> Result<Self> {
        if self.rules.contains_key(rule.name) {
            return Err(Error::config(format!(
                "duplicate rule for {}.{}",
                self.kind, rule.name
            )));
        }
        self.rules.insert(rule.name, rule);
        Ok(self)
    }
}

impl<E> RuleSet<E> {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn update_content(&self) -> NotificationContentType {
        self.update_content
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule<E>> {
        self.rules.get(field)
    }

    /// Names of all updatable fields, sorted
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.rules.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<E> fmt::Debug for RuleSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("kind", &self.kind)
            .field("fields", &self.field_names())
            .finish()
    }
}
