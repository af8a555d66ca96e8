//! Shallow client-side checks run before a create or update is sent.
//!
//! The backend enforces the real invariants (uniqueness, foreign keys);
//! these checks only catch what can be seen from the form itself, so the
//! user gets a message without a round trip.

use serde_json::Value;
use thiserror::Error;

use crate::api::Resource;
use crate::models::schedule::MINUTES_PER_DAY;
use crate::models::{ActivityCategory, PricingType, ScheduleEntry};

/// Youngest and oldest ages an activity may target
pub const MIN_AGE: i64 = 0;
pub const MAX_AGE: i64 = 120;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be a number")]
    NotANumber { field: &'static str },

    #[error("Minimum age ({min}) must be less than maximum age ({max})")]
    AgeRange { min: i64, max: i64 },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("A category named \"{name}\" already exists under this parent")]
    DuplicateName { name: String },

    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NotANumber { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Invalid { field, .. } => field,
            ValidationError::AgeRange { .. } => "age_min",
            ValidationError::DuplicateName { .. } => "name",
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    Ok(())
}

fn validate_age(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if !(MIN_AGE..=MAX_AGE).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            min: MIN_AGE as f64,
            max: MAX_AGE as f64,
        });
    }
    Ok(())
}

pub fn validate_age_range(min: i64, max: i64) -> Result<(), ValidationError> {
    validate_age("age_min", min)?;
    validate_age("age_max", max)?;
    if min >= max {
        return Err(ValidationError::AgeRange { min, max });
    }
    Ok(())
}

pub fn validate_pricing(
    pricing_type: PricingType,
    amount: &str,
    sessions_count: Option<u32>,
) -> Result<(), ValidationError> {
    validate_amount(amount)?;
    if pricing_type == PricingType::PerSessions && sessions_count.unwrap_or(0) == 0 {
        return Err(ValidationError::Required {
            field: "sessions_count",
        });
    }
    Ok(())
}

/// A decimal string, zero or more
pub fn validate_amount(amount: &str) -> Result<(), ValidationError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field: "amount" });
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber { field: "amount" })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Invalid {
            field: "amount",
            message: "must not be negative".to_string(),
        });
    }
    Ok(())
}

pub fn validate_schedule_entry(entry: &ScheduleEntry) -> Result<(), ValidationError> {
    if entry.day_of_week_utc > 6 {
        return Err(ValidationError::OutOfRange {
            field: "day_of_week_utc",
            min: 0.0,
            max: 6.0,
        });
    }
    for (field, value) in [
        ("start_minutes_utc", entry.start_minutes_utc),
        ("end_minutes_utc", entry.end_minutes_utc),
    ] {
        if value > MINUTES_PER_DAY {
            return Err(ValidationError::OutOfRange {
                field,
                min: 0.0,
                max: MINUTES_PER_DAY as f64,
            });
        }
    }
    if entry.start_minutes_utc >= entry.end_minutes_utc {
        return Err(ValidationError::Invalid {
            field: "end_minutes_utc",
            message: "must be after the start time".to_string(),
        });
    }
    Ok(())
}

pub fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<(), ValidationError> {
    if let Some(lat) = lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::OutOfRange {
                field: "lat",
                min: -90.0,
                max: 90.0,
            });
        }
    }
    if let Some(lng) = lng {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::OutOfRange {
                field: "lng",
                min: -180.0,
                max: 180.0,
            });
        }
    }
    Ok(())
}

/// Category names are unique (case-insensitive) among siblings.
///
/// `editing_id` is the category being renamed, which may keep its own name.
pub fn validate_category_name(
    name: &str,
    parent_id: Option<&str>,
    existing: &[ActivityCategory],
    editing_id: Option<&str>,
) -> Result<(), ValidationError> {
    validate_name(name)?;
    let wanted = name.trim().to_lowercase();
    let clash = existing.iter().any(|c| {
        c.parent_id.as_deref() == parent_id
            && Some(c.id.as_str()) != editing_id
            && c.name.trim().to_lowercase() == wanted
    });
    if clash {
        return Err(ValidationError::DuplicateName {
            name: name.trim().to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// JSON bodies
// ============================================================================

/// Check a raw JSON body for `resource` before sending it.
///
/// With `partial` (PATCH) absent fields are fine; fields that are present
/// still have to be valid.
pub fn validate_body(resource: Resource, body: &Value, partial: bool) -> Result<(), ValidationError> {
    let object = body.as_object().ok_or_else(|| ValidationError::Invalid {
        field: "body",
        message: "expected a JSON object".to_string(),
    })?;
    let has = |field: &str| object.get(field).map(|v| !v.is_null()).unwrap_or(false);

    match resource {
        Resource::Organizations | Resource::Categories | Resource::Areas => {
            check_name(body, partial)?;
        }
        Resource::Activities => {
            check_name(body, partial)?;
            let min = optional_int(body, "age_min")?;
            let max = optional_int(body, "age_max")?;
            match (min, max) {
                (Some(min), Some(max)) => validate_age_range(min, max)?,
                (None, _) if !partial => return Err(ValidationError::Required { field: "age_min" }),
                (_, None) if !partial => return Err(ValidationError::Required { field: "age_max" }),
                // PATCH of one bound; the pair is checked server side
                (Some(min), None) => validate_age("age_min", min)?,
                (None, Some(max)) => validate_age("age_max", max)?,
                (None, None) => {}
            }
        }
        Resource::Locations => {
            if !partial && !has("area_id") {
                return Err(ValidationError::Required { field: "area_id" });
            }
            validate_coordinates(optional_f64(body, "lat")?, optional_f64(body, "lng")?)?;
        }
        Resource::Pricing => {
            let pricing_type = match object.get("pricing_type").and_then(|v| v.as_str()) {
                Some(raw) => Some(raw.parse::<PricingType>().map_err(|message| {
                    ValidationError::Invalid {
                        field: "pricing_type",
                        message,
                    }
                })?),
                None if partial => None,
                None => return Err(ValidationError::Required { field: "pricing_type" }),
            };
            let amount = match object.get("amount") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(Value::Null) | None => None,
                Some(_) => return Err(ValidationError::NotANumber { field: "amount" }),
            };
            let sessions = optional_int(body, "sessions_count")?.map(|n| n.max(0) as u32);
            match (pricing_type, amount) {
                (Some(pricing_type), Some(amount)) => {
                    validate_pricing(pricing_type, &amount, sessions)?
                }
                (None, Some(amount)) => validate_amount(&amount)?,
                (Some(PricingType::Free), None) => {}
                (_, None) if !partial => return Err(ValidationError::Required { field: "amount" }),
                (_, None) => {}
            }
        }
        Resource::Schedules => {
            match object.get("entries") {
                Some(Value::Array(entries)) => {
                    for raw in entries {
                        let entry: ScheduleEntry = serde_json::from_value(raw.clone()).map_err(|e| {
                            ValidationError::Invalid {
                                field: "entries",
                                message: e.to_string(),
                            }
                        })?;
                        validate_schedule_entry(&entry)?;
                    }
                }
                Some(Value::Null) | None if partial => {}
                Some(Value::Null) | None => return Err(ValidationError::Required { field: "entries" }),
                Some(_) => {
                    return Err(ValidationError::Invalid {
                        field: "entries",
                        message: "expected a list".to_string(),
                    })
                }
            }
        }
        Resource::Tickets | Resource::Users => {}
    }
    Ok(())
}

fn check_name(body: &Value, partial: bool) -> Result<(), ValidationError> {
    match body.get("name") {
        Some(Value::String(name)) => validate_name(name),
        Some(Value::Null) | None if partial => Ok(()),
        _ => Err(ValidationError::Required { field: "name" }),
    }
}

/// Integer field that may arrive as a number or a numeric string
fn optional_int(body: &Value, field: &'static str) -> Result<Option<i64>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or(ValidationError::NotANumber { field }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::NotANumber { field }),
        Some(_) => Err(ValidationError::NotANumber { field }),
    }
}

fn optional_f64(body: &Value, field: &'static str) -> Result<Option<f64>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ValidationError::NotANumber { field }),
        Some(_) => Err(ValidationError::NotANumber { field }),
    }
}
