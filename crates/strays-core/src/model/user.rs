// # User profile
//
// Users own their own profile: the owner of a profile is the user itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind, GeoPoint, RequesterId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: EntityId,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub home_location: Option<GeoPoint>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub deletion_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId(id),
            display_name: display_name.into(),
            email: None,
            bio: None,
            home_location: None,
            is_deleted: false,
            deletion_requested_at: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The requester identity that owns this profile
    pub fn as_requester(&self) -> RequesterId {
        RequesterId(self.id.0)
    }
}

impl Entity for UserProfile {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<RequesterId> {
        Some(self.as_requester())
    }

    fn is_active(&self) -> bool {
        !self.is_deleted
    }

    fn deactivate(&mut self) {
        self.is_deleted = true;
        self.deletion_requested_at = Some(Utc::now());
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_owns_own_profile() {
        let user = UserProfile::new(42, "Dylan");
        assert_eq!(user.owner_id(), Some(RequesterId(42)));
    }

    #[test]
    fn test_deactivate_records_request_time() {
        let mut user = UserProfile::new(1, "User B");
        user.deactivate();
        assert!(!user.is_active());
        assert!(user.deletion_requested_at.is_some());
    }
}
