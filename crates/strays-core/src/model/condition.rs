// # Animal condition
//
// Condition values are sorted into three severity bands. The band of a new
// condition decides the priority of the alert raised when it changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Health/condition of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    #[default]
    Healthy,
    Parasites,
    Ill,
    Injured,
    Pregnant,
    NursingOffspring,
    NursingSelf,
    Underfed,
    OnMedication,
}

impl ConditionType {
    pub const ALL: [ConditionType; 9] = [
        ConditionType::Healthy,
        ConditionType::Parasites,
        ConditionType::Ill,
        ConditionType::Injured,
        ConditionType::Pregnant,
        ConditionType::NursingOffspring,
        ConditionType::NursingSelf,
        ConditionType::Underfed,
        ConditionType::OnMedication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Healthy => "HEALTHY",
            ConditionType::Parasites => "PARASITES",
            ConditionType::Ill => "ILL",
            ConditionType::Injured => "INJURED",
            ConditionType::Pregnant => "PREGNANT",
            ConditionType::NursingOffspring => "NURSING_OFFSPRING",
            ConditionType::NursingSelf => "NURSING_SELF",
            ConditionType::Underfed => "UNDERFED",
            ConditionType::OnMedication => "ON_MEDICATION",
        }
    }

    pub fn severity(&self) -> SeverityBand {
        match self {
            ConditionType::Healthy => SeverityBand::Positive,
            ConditionType::Pregnant
            | ConditionType::NursingOffspring
            | ConditionType::NursingSelf
            | ConditionType::OnMedication => SeverityBand::Caution,
            ConditionType::Ill
            | ConditionType::Injured
            | ConditionType::Underfed
            | ConditionType::Parasites => SeverityBand::Negative,
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_input(format!("unknown condition: {wanted}")))
    }
}

/// Three-level classification of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityBand {
    Positive,
    Caution,
    Negative,
}

impl SeverityBand {
    /// Caution and negative bands bias toward higher priority
    pub fn priority(&self) -> PriorityType {
        match self {
            SeverityBand::Positive => PriorityType::Low,
            SeverityBand::Caution => PriorityType::Medium,
            SeverityBand::Negative => PriorityType::High,
        }
    }
}

/// Priority of an alert notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityType {
    Low,
    Medium,
    High,
}
