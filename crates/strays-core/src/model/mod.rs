//! Entity model
//!
//! The update engine works on any type implementing [`Entity`]. Two are
//! shipped: [`Animal`] and [`UserProfile`].

pub mod animal;
pub mod condition;
pub mod user;

pub use animal::{Animal, AnimalType, SexType};
pub use condition::{ConditionType, PriorityType, SeverityBand};
pub use user::UserProfile;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::UpdateValue;

/// Identifier of a stored entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identity of an authenticated requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(pub u64);

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequesterId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Entity types that can register field rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Animal,
    User,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Animal => "animal",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "animal" => Ok(EntityKind::Animal),
            "user" => Ok(EntityKind::User),
            other => Err(Error::unknown_entity_type(other)),
        }
    }
}

/// Reference to one stored entity, carried by notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A record that accepts field-level partial updates
///
/// Implementations are plain data. Field access for updates goes through the
/// rule table registered for [`Entity::KIND`], never through this trait.
pub trait Entity:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Entity type used to look up the rule set
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    /// Identity allowed to change restricted fields, if any
    fn owner_id(&self) -> Option<RequesterId>;

    /// Inactive entities are invisible to fetches
    fn is_active(&self) -> bool;

    fn deactivate(&mut self);

    /// Stamp the last-modified time
    fn touch(&mut self, at: DateTime<Utc>);

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id())
    }
}

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Read a coordinate object from a payload value
    ///
    /// Accepts `lat`/`latitude` and `lon`/`lng`/`longitude`. Returns `None`
    /// for missing keys, non-numeric or non-finite members, and values outside
    /// [-90, 90] / [-180, 180].
    pub fn from_value(value: &UpdateValue) -> Option<Self> {
        let object = value.as_object()?;
        let pick = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| object.get(*k))
                .and_then(UpdateValue::as_f64)
        };

        let latitude = pick(&["lat", "latitude"])?;
        let longitude = pick(&["lon", "lng", "longitude"])?;

        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self::new(latitude, longitude))
    }

    pub fn to_value(self) -> UpdateValue {
        UpdateValue::Object(
            [
                ("latitude".to_string(), UpdateValue::Number(self.latitude)),
                ("longitude".to_string(), UpdateValue::Number(self.longitude)),
            ]
            .into_iter()
            .collect(),
        )
    }
}
