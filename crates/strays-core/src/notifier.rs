//! Change notification records
//!
//! [`ChangeNotifier`] turns the list of applied field changes into the
//! notification records a watcher of the entity sees. It only builds records;
//! delivering them is the coordinator's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::applier::FieldChange;
use crate::model::{EntityRef, PriorityType, RequesterId, SeverityBand};
use crate::rules::{FieldCategory, RuleSet};

/// Kind of content a notification describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationContentType {
    AnimalUpdate,
    ProfileUpdate,
    ConditionUpdate,
}

impl NotificationContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnimalUpdate => "ANIMAL_UPDATE",
            Self::ProfileUpdate => "PROFILE_UPDATE",
            Self::ConditionUpdate => "CONDITION_UPDATE",
        }
    }
}

impl fmt::Display for NotificationContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic notification listing every non-alert field changed by one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNotification {
    pub content_type: NotificationContentType,
    pub entity: EntityRef,
    pub changes: Vec<FieldChange>,
    pub registered_by: RequesterId,
    pub created_at: DateTime<Utc>,
}

/// Prioritized notification for a single condition change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotification {
    pub content_type: NotificationContentType,
    pub entity: EntityRef,
    pub change: FieldChange,
    pub registered_by: RequesterId,
    pub priority: PriorityType,
    pub severity: SeverityBand,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationRecord {
    Update(UpdateNotification),
    Alert(AlertNotification),
}

impl NotificationRecord {
    pub fn entity(&self) -> EntityRef {
        match self {
            Self::Update(n) => n.entity,
            Self::Alert(n) => n.entity,
        }
    }

    pub fn content_type(&self) -> NotificationContentType {
        match self {
            Self::Update(n) => n.content_type,
            Self::Alert(n) => n.content_type,
        }
    }

    pub fn as_update(&self) -> Option<&UpdateNotification> {
        match self {
            Self::Update(n) => Some(n),
            Self::Alert(_) => None,
        }
    }

    pub fn as_alert(&self) -> Option<&AlertNotification> {
        match self {
            Self::Alert(n) => Some(n),
            Self::Update(_) => None,
        }
    }
}

/// Builds notification records from applied changes
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeNotifier;

impl ChangeNotifier {
    pub fn new() -> Self {
        Self
    }

    /// Build the records for one applied update
    ///
    /// Condition-category fields yield one alert each, in applied order.
    /// Everything else, including condition values that cannot be
    /// classified, folds into a single trailing update notification.
    ///
    /// # Returns
    ///
    /// An empty list when `applied` is empty.
    pub fn notify<E>(
        &self,
        rules: &RuleSet<E>,
        entity: EntityRef,
        applied: &[FieldChange],
        requester: RequesterId,
    ) -> Vec<NotificationRecord> {
        let now = Utc::now();
        let mut records = Vec::new();
        let mut general = Vec::new();

        for change in applied {
            let category = rules
                .get(&change.field)
                .map_or(FieldCategory::General, |rule| rule.category());

            match category {
                FieldCategory::Condition {
                    content_type,
                    classify,
                } => match classify(&change.new) {
                    Some(severity) => {
                        debug!(
                            "Alert for {} on {}: {:?} ({:?})",
                            change.field,
                            entity,
                            severity,
                            severity.priority()
                        );
                        records.push(NotificationRecord::Alert(AlertNotification {
                            content_type,
                            entity,
                            change: change.clone(),
                            registered_by: requester,
                            priority: severity.priority(),
                            severity,
                            created_at: now,
                        }));
                    }
                    None => general.push(change.clone()),
                },
                FieldCategory::General => general.push(change.clone()),
            }
        }

        if !general.is_empty() {
            records.push(NotificationRecord::Update(UpdateNotification {
                content_type: rules.update_content(),
                entity,
                changes: general,
                registered_by: requester,
                created_at: now,
            }));
        }

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Animal, EntityId, EntityKind};
    use crate::rules::{self, FieldRule, Tier};
    use crate::value::UpdateValue;

    fn change(field: &str, old: impl Into<UpdateValue>, new: impl Into<UpdateValue>) -> FieldChange {
        FieldChange::new(field, old.into(), new.into())
    }

    fn animal_ref() -> EntityRef {
        EntityRef::new(EntityKind::Animal, EntityId(1))
    }

    #[test]
    fn test_general_fields_fold_into_one_update() {
        let rules = rules::animal::rules().unwrap();
        let applied = vec![change("name", "Rex", "Max"), change("dangerous", false, true)];

        let records = ChangeNotifier::new().notify(&rules, animal_ref(), &applied, RequesterId(1));

        assert_eq!(records.len(), 1);
        let update = records[0].as_update().unwrap();
        assert_eq!(update.content_type, NotificationContentType::AnimalUpdate);
        assert_eq!(update.changes, applied);
        assert_eq!(update.registered_by, RequesterId(1));
    }

    #[test]
    fn test_condition_alerts_come_first() {
        let rules = rules::animal::rules().unwrap();
        let applied = vec![change("name", "Rex", "Max"), change("condition", "HEALTHY", "INJURED")];

        let records = ChangeNotifier::new().notify(&rules, animal_ref(), &applied, RequesterId(2));

        assert_eq!(records.len(), 2);
        let alert = records[0].as_alert().unwrap();
        assert_eq!(alert.content_type, NotificationContentType::ConditionUpdate);
        assert_eq!(alert.priority, PriorityType::High);
        assert_eq!(alert.severity, SeverityBand::Negative);
        assert_eq!(alert.change.field, "condition");
        assert_eq!(records[1].as_update().unwrap().changes.len(), 1);
    }

    #[test]
    fn test_unclassifiable_condition_folds_into_update() {
        fn read(_: &Animal) -> UpdateValue {
            UpdateValue::Null
        }
        fn write(_: &mut Animal, _: &UpdateValue) -> bool {
            true
        }
        fn never(_: &UpdateValue) -> Option<SeverityBand> {
            None
        }

        let rules = rules::RuleSet::<Animal>::new(NotificationContentType::AnimalUpdate)
            .with(
                FieldRule::new("condition", Tier::Public, |_| true, read, write)
                    .alerting(NotificationContentType::ConditionUpdate, never),
            )
            .unwrap();
        let applied = vec![change("condition", "HEALTHY", "???")];

        let records = ChangeNotifier::new().notify(&rules, animal_ref(), &applied, RequesterId(2));

        assert_eq!(records.len(), 1);
        assert!(records[0].as_update().is_some());
    }

    #[test]
    fn test_nothing_applied_nothing_built() {
        let rules = rules::animal::rules().unwrap();
        let records = ChangeNotifier::new().notify(&rules, animal_ref(), &[], RequesterId(1));
        assert!(records.is_empty());
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let rules = rules::animal::rules().unwrap();
        let applied = vec![change("condition", "HEALTHY", "PREGNANT")];
        let records = ChangeNotifier::new().notify(&rules, animal_ref(), &applied, RequesterId(2));

        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["kind"], "alert");
        assert_eq!(json["content_type"], "CONDITION_UPDATE");
        assert_eq!(json["priority"], "MEDIUM");
    }
}
