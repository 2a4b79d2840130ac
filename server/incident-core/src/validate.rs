//! Validation layer: schema-checks create/update payloads.
//!
//! Only the known incident fields are read from the payload; anything else
//! (including `id`, `createdAt`, `updatedAt`) is ignored. All violations are
//! collected before returning so the caller sees every bad field at once.

use serde_json::{Map, Value};

use crate::error::{TrackerError, ValidationError};
use crate::types::*;

const MISSING: &str = "Missing data for required field.";
const NULL: &str = "Field may not be null.";
const NOT_STRING: &str = "Not a valid string.";

/// Decode a request body into a JSON object. Anything else is malformed.
pub fn parse_object(body: &[u8]) -> Result<Map<String, Value>, TrackerError> {
  match serde_json::from_slice::<Value>(body) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Err(TrackerError::malformed("expected a JSON object")),
    Err(e) => Err(TrackerError::malformed(format!("json parse: {}", e))),
  }
}

/// Validate a create payload into a normalized record-to-create.
pub fn validate_create(payload: &Map<String, Value>) -> Result<NewIncident, ValidationError> {
  let mut errors = ValidationError::default();

  let title = required(payload, "title", &mut errors)
    .and_then(|s| text_within(s, "title", TITLE_MIN_LEN, TITLE_MAX_LEN, &mut errors));
  let service = required(payload, "service", &mut errors)
    .and_then(|s| text_within(s, "service", SERVICE_MIN_LEN, SERVICE_MAX_LEN, &mut errors));
  let severity = required(payload, "severity", &mut errors)
    .and_then(|s| one_of(s, "severity", Severity::parse, &Severity::ALL.map(Severity::as_str), &mut errors));

  let status = match read(payload, "status", &mut errors) {
    Field::Absent => Some(Status::default()),
    Field::Null => {
      errors.add("status", NULL);
      None
    }
    Field::Text(s) => one_of(s, "status", Status::parse, &Status::ALL.map(Status::as_str), &mut errors),
    Field::Invalid => None,
  };

  let owner = nullable_owner(payload, &mut errors).unwrap_or(None);
  let summary = nullable_summary(payload, &mut errors).unwrap_or(None);

  match (title, service, severity, status) {
    (Some(title), Some(service), Some(severity), Some(status)) if errors.is_empty() => Ok(NewIncident {
      title,
      service,
      severity,
      status,
      owner,
      summary,
    }),
    _ => Err(errors),
  }
}

/// Validate a partial update. Only fields present in the payload are returned.
pub fn validate_update(payload: &Map<String, Value>) -> Result<IncidentPatch, ValidationError> {
  let mut errors = ValidationError::default();

  let title = optional(payload, "title", &mut errors)
    .and_then(|s| text_within(s, "title", TITLE_MIN_LEN, TITLE_MAX_LEN, &mut errors));
  let service = optional(payload, "service", &mut errors)
    .and_then(|s| text_within(s, "service", SERVICE_MIN_LEN, SERVICE_MAX_LEN, &mut errors));
  let severity = optional(payload, "severity", &mut errors)
    .and_then(|s| one_of(s, "severity", Severity::parse, &Severity::ALL.map(Severity::as_str), &mut errors));
  let status = optional(payload, "status", &mut errors)
    .and_then(|s| one_of(s, "status", Status::parse, &Status::ALL.map(Status::as_str), &mut errors));
  let owner = nullable_owner(payload, &mut errors);
  let summary = nullable_summary(payload, &mut errors);

  if !errors.is_empty() {
    return Err(errors);
  }

  Ok(IncidentPatch {
    title,
    service,
    severity,
    status,
    owner,
    summary,
  })
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

enum Field<'a> {
  Absent,
  Null,
  Text(&'a str),
  /// Present but not a string; already recorded.
  Invalid,
}

fn read<'a>(payload: &'a Map<String, Value>, field: &str, errors: &mut ValidationError) -> Field<'a> {
  match payload.get(field) {
    None => Field::Absent,
    Some(Value::Null) => Field::Null,
    Some(Value::String(s)) => Field::Text(s),
    Some(_) => {
      errors.add(field, NOT_STRING);
      Field::Invalid
    }
  }
}

fn required<'a>(payload: &'a Map<String, Value>, field: &str, errors: &mut ValidationError) -> Option<&'a str> {
  match read(payload, field, errors) {
    Field::Text(s) => Some(s),
    Field::Absent => {
      errors.add(field, MISSING);
      None
    }
    Field::Null => {
      errors.add(field, NULL);
      None
    }
    Field::Invalid => None,
  }
}

fn optional<'a>(payload: &'a Map<String, Value>, field: &str, errors: &mut ValidationError) -> Option<&'a str> {
  match read(payload, field, errors) {
    Field::Text(s) => Some(s),
    Field::Null => {
      errors.add(field, NULL);
      None
    }
    Field::Absent | Field::Invalid => None,
  }
}

/// `None` = absent; `Some(None)` = explicit null; `Some(Some(_))` = value.
fn nullable<'a>(
  payload: &'a Map<String, Value>,
  field: &str,
  errors: &mut ValidationError,
) -> Option<Option<&'a str>> {
  match read(payload, field, errors) {
    Field::Absent | Field::Invalid => None,
    Field::Null => Some(None),
    Field::Text(s) => Some(Some(s)),
  }
}

fn nullable_owner(payload: &Map<String, Value>, errors: &mut ValidationError) -> Option<Option<String>> {
  nullable(payload, "owner", errors).and_then(|owner| match owner {
    None => Some(None),
    Some(s) => text_within(s, "owner", 0, OWNER_MAX_LEN, errors).map(Some),
  })
}

fn nullable_summary(payload: &Map<String, Value>, errors: &mut ValidationError) -> Option<Option<String>> {
  nullable(payload, "summary", errors).map(|s| s.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

fn text_within(s: &str, field: &str, min: usize, max: usize, errors: &mut ValidationError) -> Option<String> {
  let len = s.chars().count();
  if len < min || len > max {
    let msg = if min == 0 {
      format!("Longer than maximum length {}.", max)
    } else {
      format!("Length must be between {} and {}.", min, max)
    };
    errors.add(field, msg);
    return None;
  }
  Some(s.to_string())
}

fn one_of<T>(
  s: &str,
  field: &str,
  parse: fn(&str) -> Option<T>,
  allowed: &[&str],
  errors: &mut ValidationError,
) -> Option<T> {
  let parsed = parse(s);
  if parsed.is_none() {
    errors.add(field, format!("Must be one of: {}.", allowed.join(", ")));
  }
  parsed
}
