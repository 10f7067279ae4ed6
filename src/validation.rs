//! Field constraints shared by account registration and profile forms.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ValidationError;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const NAME_MAX: usize = 50;
pub const SPECIALIZATION_MAX: usize = 100;
pub const CONTACT_MAX: usize = 20;
pub const EMAIL_MAX: usize = 120;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

/// Non-blank, at most `max` characters. Returns the trimmed value.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field(field, "is required"));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::field(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Non-blank free text with no length ceiling (reasons, addresses).
pub fn required_body(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::field(field, "is required"));
    }
    Ok(trimmed.to_string())
}

pub fn username(value: &str) -> Result<String, ValidationError> {
    let len = value.chars().count();
    if value.trim() != value || !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ValidationError::field(
            "username",
            format!("must be {USERNAME_MIN} to {USERNAME_MAX} characters without surrounding spaces"),
        ));
    }
    Ok(value.to_string())
}

pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = required_text(field, value, EMAIL_MAX)?;
    if !EMAIL_PATTERN.is_match(&value) {
        return Err(ValidationError::field(field, "is not a valid email address"));
    }
    Ok(value)
}

pub fn date_of_birth(value: NaiveDate, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if value > today {
        return Err(ValidationError::field(
            "date_of_birth",
            "cannot be in the future",
        ));
    }
    Ok(value)
}
