//! Structured error types for the incident tracker.

use std::collections::BTreeMap;

use thiserror::Error;

/// Every violated field constraint of one payload, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", field_list(.details))]
pub struct ValidationError {
  pub details: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self
      .details
      .entry(field.to_string())
      .or_default()
      .push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.details.is_empty()
  }

  pub fn has(&self, field: &str) -> bool {
    self.details.contains_key(field)
  }
}

fn field_list(details: &BTreeMap<String, Vec<String>>) -> String {
  details.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum TrackerError {
  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("incident not found: {0}")]
  NotFound(String),

  #[error("malformed request: {0}")]
  Malformed(String),

  #[error("storage: {0}")]
  Storage(String),
}

impl TrackerError {
  pub fn not_found(id: impl Into<String>) -> Self {
    Self::NotFound(id.into())
  }

  pub fn malformed(msg: impl Into<String>) -> Self {
    Self::Malformed(msg.into())
  }

  pub fn storage(msg: impl Into<String>) -> Self {
    Self::Storage(msg.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collects_multiple_messages_per_field() {
    let mut err = ValidationError::default();
    err.add("title", "Missing data for required field.");
    err.add("severity", "Must be one of: SEV1, SEV2, SEV3, SEV4.");
    err.add("title", "second");
    assert_eq!(err.details["title"].len(), 2);
    assert!(err.has("severity"));
    assert_eq!(err.to_string(), "validation failed: severity, title");
  }

  #[test]
  fn validation_converts_into_tracker_error() {
    let mut err = ValidationError::default();
    err.add("service", "boom");
    let e: TrackerError = err.into();
    assert!(matches!(e, TrackerError::Validation(_)));
    assert!(e.to_string().contains("service"));
  }
}
