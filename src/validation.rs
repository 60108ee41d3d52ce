//! Validation of donor submissions. Shared by the server, which
//! validates whole submissions, and the registration form, which
//! validates one field at a time.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use time::{macros::format_description, Date};

use crate::donor::{BloodGroup, DonorSubmission, NewDonor};
use crate::errors::ValidationError;

pub const MINIMUM_AGE: i64 = 18;
pub const MAXIMUM_AGE: i64 = 65;

const MINIMUM_TEXT_LENGTH: usize = 2;

lazy_static! {
    static ref PHONE_PATTERN: Regex =
        Regex::new(r"^[+]?[\d\s\-()]{10,15}$").expect("compile phone pattern");
}

/// Turns a raw submission into a donor ready for insertion. Values are
/// kept exactly as submitted; trimming only applies to the checks.
pub fn validate(submission: DonorSubmission) -> Result<NewDonor, ValidationError> {
    let DonorSubmission {
        name,
        blood_group,
        age,
        gender,
        phone,
        city,
        state,
        last_donation,
    } = submission;

    let name = required(name)?;
    let blood_group = required(blood_group)?;
    let age = age.filter(|v| !is_blank(v)).ok_or(ValidationError::MissingFields)?;
    let gender = required(gender)?;
    let phone = required(phone)?;
    let city = required(city)?;
    let state = required(state)?;

    let age = parse_age(&age)?;
    check_age(age)?;
    let blood_group: BloodGroup = blood_group.parse()?;
    check_name(&name)?;
    check_phone(&phone)?;
    check_text(&city, ValidationError::CityTooShort)?;
    check_text(&state, ValidationError::StateTooShort)?;
    let last_donation = parse_last_donation(last_donation.as_deref())?;

    Ok(NewDonor {
        name,
        blood_group,
        // the range check above guarantees this fits
        age: age as i32,
        gender,
        phone,
        city,
        state,
        last_donation,
    })
}

pub fn check_name(name: &str) -> Result<(), ValidationError> {
    check_text(name, ValidationError::NameTooShort)
}

pub fn check_age(age: i64) -> Result<(), ValidationError> {
    if (MINIMUM_AGE..=MAXIMUM_AGE).contains(&age) {
        Ok(())
    } else {
        Err(ValidationError::AgeOutOfRange)
    }
}

pub fn check_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn check_text(value: &str, error: ValidationError) -> Result<(), ValidationError> {
    if value.trim().chars().count() >= MINIMUM_TEXT_LENGTH {
        Ok(())
    } else {
        Err(error)
    }
}

/// Parses an optional `YYYY-MM-DD` date, treating blank as absent.
pub fn parse_last_donation(value: Option<&str>) -> Result<Option<Date>, ValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => Date::parse(value, format_description!("[year]-[month]-[day]"))
            .map(Some)
            .map_err(|_| ValidationError::InvalidLastDonation),
        None => Ok(None),
    }
}

fn required(value: Option<String>) -> Result<String, ValidationError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingFields)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_age(value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or(ValidationError::InvalidAge),
        Value::String(s) => s.trim().parse().map_err(|_| ValidationError::InvalidAge),
        _ => Err(ValidationError::InvalidAge),
    }
}
