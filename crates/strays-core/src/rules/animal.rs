// # Animal field rules
//
// | field         | tier        |
// |---------------|-------------|
// | `name`        | public      |
// | `description` | public      |
// | `condition`   | public, raises an alert |
// | `sex`         | conditional: anyone while unknown, then owner only |
// | `dangerous`   | conditional: anyone may raise, only the owner may clear |
// | `location`    | restricted  |
// | `type`        | restricted  |

use crate::auth::AuthorizationContext;
use crate::error::Result;
use crate::model::{Animal, AnimalType, ConditionType, GeoPoint, SeverityBand, SexType};
use crate::notifier::NotificationContentType;
use crate::value::UpdateValue;

use super::validators;
use super::{FieldRule, RuleSet, Tier};

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Build the rule set for [`Animal`]
pub fn rules() -> Result<RuleSet<Animal>> {
    RuleSet::<Animal>::new(NotificationContentType::AnimalUpdate)
        .with(FieldRule::new(
            "name",
            Tier::Public,
            |v| validators::bounded_text(v, MAX_NAME_CHARS),
            |a| UpdateValue::string(a.name.clone()),
            write_name,
        ))?
        .with(FieldRule::new(
            "description",
            Tier::Public,
            |v| validators::optional_text(v, MAX_DESCRIPTION_CHARS),
            |a| UpdateValue::from(a.description.clone()),
            write_description,
        ))?
        .with(
            FieldRule::new(
                "condition",
                Tier::Public,
                validators::one_of::<ConditionType>,
                |a: &Animal| UpdateValue::from(a.condition.as_str()),
                write_condition,
            )
            .alerting(NotificationContentType::ConditionUpdate, classify_condition),
        )?
        .with(FieldRule::new(
            "sex",
            Tier::Conditional(sex_condition),
            validators::one_of::<SexType>,
            |a| UpdateValue::from(a.sex.as_str()),
            write_sex,
        ))?
        .with(FieldRule::new(
            "dangerous",
            Tier::Conditional(dangerous_condition),
            validators::boolean,
            |a| UpdateValue::Bool(a.dangerous),
            write_dangerous,
        ))?
        .with(FieldRule::new(
            "location",
            Tier::Restricted,
            validators::coordinates,
            |a| a.location.map_or(UpdateValue::Null, GeoPoint::to_value),
            write_location,
        ))?
        .with(FieldRule::new(
            "type",
            Tier::Restricted,
            validators::one_of::<AnimalType>,
            |a| UpdateValue::from(a.animal_type.as_str()),
            write_type,
        ))
}

/// Severity band of a condition value
pub fn classify_condition(value: &UpdateValue) -> Option<SeverityBand> {
    value
        .as_str()?
        .parse::<ConditionType>()
        .ok()
        .map(|c| c.severity())
}

/// Sex may be filled in by anyone while it is still unknown
fn sex_condition(ctx: &AuthorizationContext<'_, Animal>, _value: &UpdateValue) -> bool {
    ctx.snapshot.sex == SexType::Unknown || ctx.is_owner()
}

/// Anyone may flag an animal as dangerous; only the owner may clear the flag
fn dangerous_condition(ctx: &AuthorizationContext<'_, Animal>, value: &UpdateValue) -> bool {
    value.as_bool() == Some(true) || ctx.is_owner()
}

fn write_name(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value.as_str() {
        Some(name) => {
            animal.name = name.trim().to_string();
            true
        }
        None => false,
    }
}

fn write_description(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value {
        UpdateValue::Null => animal.description = None,
        UpdateValue::String(s) => animal.description = Some(s.clone()),
        _ => return false,
    }
    true
}

fn write_condition(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value.as_str().map(str::parse::<ConditionType>) {
        Some(Ok(condition)) => {
            animal.condition = condition;
            true
        }
        _ => false,
    }
}

fn write_sex(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value.as_str().map(str::parse::<SexType>) {
        Some(Ok(sex)) => {
            animal.sex = sex;
            true
        }
        _ => false,
    }
}

fn write_dangerous(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value.as_bool() {
        Some(dangerous) => {
            animal.dangerous = dangerous;
            true
        }
        None => false,
    }
}

fn write_location(animal: &mut Animal, value: &UpdateValue) -> bool {
    match GeoPoint::from_value(value) {
        Some(point) => {
            animal.location = Some(point);
            true
        }
        None => false,
    }
}

fn write_type(animal: &mut Animal, value: &UpdateValue) -> bool {
    match value.as_str().map(str::parse::<AnimalType>) {
        Some(Ok(animal_type)) => {
            animal.animal_type = animal_type;
            true
        }
        _ => false,
    }
}
