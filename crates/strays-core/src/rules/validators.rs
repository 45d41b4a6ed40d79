//! Reusable value validators
//!
//! All validators are pure and total: they look only at the raw value and
//! answer yes or no.

use std::str::FromStr;

use crate::model::GeoPoint;
use crate::value::UpdateValue;

/// Non-empty (after trimming) string of at most `max_chars` characters
pub fn bounded_text(value: &UpdateValue, max_chars: usize) -> bool {
    value.as_str().is_some_and(|s| {
        let trimmed = s.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= max_chars
    })
}

/// String of at most `max_chars` characters, or `null` to clear the field
pub fn optional_text(value: &UpdateValue, max_chars: usize) -> bool {
    match value {
        UpdateValue::Null => true,
        UpdateValue::String(s) => s.chars().count() <= max_chars,
        _ => false,
    }
}

pub fn boolean(value: &UpdateValue) -> bool {
    value.as_bool().is_some()
}

/// String naming a variant of `T` (as accepted by its `FromStr`)
pub fn one_of<T: FromStr>(value: &UpdateValue) -> bool {
    value.as_str().is_some_and(|s| s.parse::<T>().is_ok())
}

/// Coordinate object, see [`GeoPoint::from_value`]
pub fn coordinates(value: &UpdateValue) -> bool {
    GeoPoint::from_value(value).is_some()
}

/// Coordinate object, or `null` to clear the field
pub fn optional_coordinates(value: &UpdateValue) -> bool {
    value.is_null() || coordinates(value)
}

/// Plausible e-mail address: exactly one `@` with a non-empty part on each
/// side, no whitespace, at most 254 characters
pub fn email(value: &UpdateValue) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    if s.chars().count() > 254 || s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
