// # strays-core
//
// Field-level update authorization engine for the Strays shelter-animal
// tracker.
//
// ## Architecture Overview
//
// Clients submit partial updates as untyped key/value payloads. The engine
// decides field by field whether the requester may change each field,
// applies only the permitted changes, persists them and records the
// resulting notifications:
// - **RuleSet / FieldRule**: Declarative per-field validator, access tier and accessors
// - **RuleRegistry**: One rule set per entity type, read-only once shared
// - **AuthorizationEvaluator**: Pure per-field permission check
// - **UpdateApplier**: Applies a request onto a working copy of the entity
// - **ChangeNotifier**: Builds update and alert notifications from applied changes
// - **UpdateCoordinator**: Fetch → apply → persist → notify, owns atomicity
//
// ## Design Principles
//
// 1. **Gates before writes**: A field changes only if a rule exists, the value
//    validates and the requester is authorized
// 2. **All or nothing per call**: Nothing applied means nothing stored or notified
// 3. **Notify after persist**: Notifications describe only saved changes
// 4. **Library-First**: Storage, notifications and identity are traits

pub mod applier;
pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod notifier;
pub mod registry;
pub mod rules;
pub mod store;
pub mod traits;
pub mod value;

// Re-export core types for convenience
pub use applier::{ApplicationOutcome, FieldChange, UpdateApplier};
pub use auth::{AuthorizationContext, AuthorizationEvaluator};
pub use config::{CoordinatorConfig, DeliveryGuarantee, StraysConfig};
pub use coordinator::{CoordinatorEvent, UpdateCoordinator, UpdateStage};
pub use error::{Error, Result};
pub use model::{Entity, EntityId, EntityKind, EntityRef, RequesterId};
pub use notifier::{ChangeNotifier, NotificationRecord};
pub use registry::RuleRegistry;
pub use store::{FileEntityStore, FileNotificationLog, MemoryEntityStore, MemoryNotificationLog};
pub use traits::{IdentityProvider, NotificationGateway, PersistenceGateway};
pub use value::{UpdateRequest, UpdateValue};
