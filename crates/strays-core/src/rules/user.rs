// # User profile field rules
//
// Every profile field is restricted: only the user may edit their own profile.

use crate::error::Result;
use crate::model::{GeoPoint, UserProfile};
use crate::notifier::NotificationContentType;
use crate::value::UpdateValue;

use super::validators;
use super::{FieldRule, RuleSet, Tier};

const MAX_DISPLAY_NAME_CHARS: usize = 50;
const MAX_BIO_CHARS: usize = 500;

/// Build the rule set for [`UserProfile`]
pub fn rules() -> Result<RuleSet<UserProfile>> {
    RuleSet::<UserProfile>::new(NotificationContentType::ProfileUpdate)
        .with(FieldRule::new(
            "display_name",
            Tier::Restricted,
            |v| validators::bounded_text(v, MAX_DISPLAY_NAME_CHARS),
            |u| UpdateValue::string(u.display_name.clone()),
            write_display_name,
        ))?
        .with(FieldRule::new(
            "bio",
            Tier::Restricted,
            |v| validators::optional_text(v, MAX_BIO_CHARS),
            |u| UpdateValue::from(u.bio.clone()),
            write_bio,
        ))?
        .with(FieldRule::new(
            "email",
            Tier::Restricted,
            validators::email,
            |u| UpdateValue::from(u.email.clone()),
            write_email,
        ))?
        .with(FieldRule::new(
            "home_location",
            Tier::Restricted,
            validators::optional_coordinates,
            |u| u.home_location.map_or(UpdateValue::Null, GeoPoint::to_value),
            write_home_location,
        ))
}

fn write_display_name(user: &mut UserProfile, value: &UpdateValue) -> bool {
    match value.as_str() {
        Some(name) => {
            user.display_name = name.trim().to_string();
            true
        }
        None => false,
    }
}

fn write_bio(user: &mut UserProfile, value: &UpdateValue) -> bool {
    match value {
        UpdateValue::Null => user.bio = None,
        UpdateValue::String(s) => user.bio = Some(s.clone()),
        _ => return false,
    }
    true
}

fn write_email(user: &mut UserProfile, value: &UpdateValue) -> bool {
    match value.as_str() {
        Some(email) => {
            user.email = Some(email.to_ascii_lowercase());
            true
        }
        None => false,
    }
}

fn write_home_location(user: &mut UserProfile, value: &UpdateValue) -> bool {
    if value.is_null() {
        user.home_location = None;
        return true;
    }
    match GeoPoint::from_value(value) {
        Some(point) => {
            user.home_location = Some(point);
            true
        }
        None => false,
    }
}
