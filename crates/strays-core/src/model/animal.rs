// # Animal
//
// A tracked stray. The primary caretaker is the owner for restricted fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ConditionType, Entity, EntityId, EntityKind, GeoPoint, RequesterId};
use crate::error::Error;

/// Species of a tracked animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimalType {
    Cat,
    Dog,
}

impl AnimalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnimalType::Cat => "CAT",
            AnimalType::Dog => "DOG",
        }
    }
}

impl fmt::Display for AnimalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CAT" => Ok(AnimalType::Cat),
            "DOG" => Ok(AnimalType::Dog),
            other => Err(Error::invalid_input(format!("unknown animal type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SexType {
    Male,
    Female,
    #[default]
    Unknown,
}

impl SexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SexType::Male => "MALE",
            SexType::Female => "FEMALE",
            SexType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SexType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" => Ok(SexType::Male),
            "FEMALE" => Ok(SexType::Female),
            "UNKNOWN" => Ok(SexType::Unknown),
            other => Err(Error::invalid_input(format!("unknown sex: {other}"))),
        }
    }
}

/// A tracked animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub animal_type: AnimalType,
    pub sex: SexType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub condition: ConditionType,
    /// Flagged as unsafe to approach
    #[serde(default)]
    pub dangerous: bool,
    #[serde(default)]
    pub primary_caretaker: Option<RequesterId>,
    /// False once the animal has been deactivated
    #[serde(default = "default_should_appear")]
    pub should_appear: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

fn default_should_appear() -> bool {
    true
}

impl Animal {
    /// Create a new, healthy, ownerless animal
    pub fn new(
        id: u64,
        animal_type: AnimalType,
        sex: SexType,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId(id),
            animal_type,
            sex,
            name: name.into(),
            description: None,
            location: None,
            condition: ConditionType::Healthy,
            dangerous: false,
            primary_caretaker: None,
            should_appear: true,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_caretaker(mut self, caretaker: RequesterId) -> Self {
        self.primary_caretaker = Some(caretaker);
        self
    }

    pub fn with_condition(mut self, condition: ConditionType) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_dangerous(mut self, dangerous: bool) -> Self {
        self.dangerous = dangerous;
        self
    }
}

impl Entity for Animal {
    const KIND: EntityKind = EntityKind::Animal;

    fn id(&self) -> EntityId {
        self.id
    }

    fn owner_id(&self) -> Option<RequesterId> {
        self.primary_caretaker
    }

    fn is_active(&self) -> bool {
        self.should_appear
    }

    fn deactivate(&mut self) {
        self.should_appear = false;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
}
