//! Core types for the incident tracker (entity model + wire contracts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Field constraints
// ---------------------------------------------------------------------------

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 255;
pub const SERVICE_MIN_LEN: usize = 1;
pub const SERVICE_MAX_LEN: usize = 120;
pub const OWNER_MAX_LEN: usize = 120;

// ---------------------------------------------------------------------------
// Severity / Status (closed sets)
// ---------------------------------------------------------------------------

/// Urgency ranking. SEV1 is the most critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
  #[serde(rename = "SEV1")]
  Sev1,
  #[serde(rename = "SEV2")]
  Sev2,
  #[serde(rename = "SEV3")]
  Sev3,
  #[serde(rename = "SEV4")]
  Sev4,
}

impl Severity {
  pub const ALL: [Severity; 4] = [Self::Sev1, Self::Sev2, Self::Sev3, Self::Sev4];

  /// Exact match against the wire spelling.
  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|v| v.as_str() == s)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Sev1 => "SEV1",
      Self::Sev2 => "SEV2",
      Self::Sev3 => "SEV3",
      Self::Sev4 => "SEV4",
    }
  }
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Lifecycle stage of an incident.
///
/// The expected path is OPEN -> MITIGATED -> RESOLVED, but any transition
/// (including RESOLVED -> OPEN) is accepted on update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
  #[default]
  Open,
  Mitigated,
  Resolved,
}

impl Status {
  pub const ALL: [Status; 3] = [Self::Open, Self::Mitigated, Self::Resolved];

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|v| v.as_str() == s)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "OPEN",
      Self::Mitigated => "MITIGATED",
      Self::Resolved => "RESOLVED",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Incident (internal record)
// ---------------------------------------------------------------------------

/// Stored incident record.
#[derive(Debug, Clone, PartialEq)]
pub struct Incident {
  pub id: Uuid,
  pub title: String,
  pub service: String,
  pub severity: Severity,
  pub status: Status,
  pub owner: Option<String>,
  pub summary: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Incident {
  /// Build a fresh record from validated input. `created_at == updated_at`.
  pub fn create(new: NewIncident, now: DateTime<Utc>) -> Self {
    Self {
      id: Uuid::new_v4(),
      title: new.title,
      service: new.service,
      severity: new.severity,
      status: new.status,
      owner: new.owner,
      summary: new.summary,
      created_at: now,
      updated_at: now,
    }
  }

  /// Apply a validated partial update in place and refresh `updated_at`.
  ///
  /// `updated_at` never moves backwards, even if the clock does.
  pub fn apply(&mut self, patch: &IncidentPatch, now: DateTime<Utc>) {
    if let Some(title) = &patch.title {
      self.title = title.clone();
    }
    if let Some(service) = &patch.service {
      self.service = service.clone();
    }
    if let Some(severity) = patch.severity {
      self.severity = severity;
    }
    if let Some(status) = patch.status {
      self.status = status;
    }
    if let Some(owner) = &patch.owner {
      self.owner = owner.clone();
    }
    if let Some(summary) = &patch.summary {
      self.summary = summary.clone();
    }
    self.updated_at = now.max(self.updated_at);
  }

  /// External representation with stable camelCase field names.
  pub fn to_view(&self) -> IncidentView {
    IncidentView {
      id: self.id.to_string(),
      title: self.title.clone(),
      service: self.service.clone(),
      severity: self.severity,
      status: self.status,
      owner: self.owner.clone(),
      summary: self.summary.clone(),
      created_at: self.created_at.to_rfc3339(),
      updated_at: self.updated_at.to_rfc3339(),
    }
  }
}

// ---------------------------------------------------------------------------
// Command inputs (output of the validation layer)
// ---------------------------------------------------------------------------

/// Normalized record-to-create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
  pub title: String,
  pub service: String,
  pub severity: Severity,
  pub status: Status,
  pub owner: Option<String>,
  pub summary: Option<String>,
}

/// Fields to change on update. `None` = leave untouched.
///
/// `owner` and `summary` are nullable: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentPatch {
  pub title: Option<String>,
  pub service: Option<String>,
  pub severity: Option<Severity>,
  pub status: Option<Status>,
  pub owner: Option<Option<String>>,
  pub summary: Option<Option<String>>,
}

impl IncidentPatch {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }
}

// ---------------------------------------------------------------------------
// Output types (JSON contract)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
  pub id: String,
  pub title: String,
  pub service: String,
  pub severity: Severity,
  pub status: Status,
  pub owner: Option<String>,
  pub summary: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

/// A bounded, ordered slice of a filtered collection plus paging metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total: u64,
  pub page: u64,
  pub per_page: u64,
  pub total_pages: u64,
}

impl<T> Page<T> {
  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items: self.items.into_iter().map(f).collect(),
      total: self.total,
      page: self.page,
      per_page: self.per_page,
      total_pages: self.total_pages,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn sample() -> Incident {
    let t = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    Incident::create(
      NewIncident {
        title: "DB down".into(),
        service: "payment-gateway".into(),
        severity: Severity::Sev1,
        status: Status::Open,
        owner: None,
        summary: None,
      },
      t,
    )
  }

  #[test]
  fn enum_wire_spellings() {
    assert_eq!(serde_json::to_string(&Severity::Sev2).unwrap(), "\"SEV2\"");
    assert_eq!(serde_json::to_string(&Status::Mitigated).unwrap(), "\"MITIGATED\"");
    assert_eq!(Severity::parse("SEV4"), Some(Severity::Sev4));
    assert_eq!(Severity::parse("sev4"), None);
    assert_eq!(Status::parse("RESOLVED"), Some(Status::Resolved));
    assert_eq!(Status::parse("CLOSED"), None);
  }

  #[test]
  fn view_uses_camel_case_and_rfc3339() {
    let inc = sample();
    let json = serde_json::to_value(inc.to_view()).unwrap();
    assert_eq!(json["createdAt"], "2025-01-15T10:30:00+00:00");
    assert_eq!(json["updatedAt"], json["createdAt"]);
    assert_eq!(json["severity"], "SEV1");
    assert_eq!(json["status"], "OPEN");
    assert!(json["owner"].is_null());
    assert!(json["summary"].is_null());
    assert!(json.get("created_at").is_none());
  }

  #[test]
  fn apply_changes_only_present_fields() {
    let mut inc = sample();
    let before = inc.clone();
    let later = before.updated_at + Duration::seconds(5);
    let patch = IncidentPatch {
      status: Some(Status::Mitigated),
      owner: Some(Some("Alice Chen".into())),
      ..Default::default()
    };
    inc.apply(&patch, later);
    assert_eq!(inc.status, Status::Mitigated);
    assert_eq!(inc.owner.as_deref(), Some("Alice Chen"));
    assert_eq!(inc.title, before.title);
    assert_eq!(inc.created_at, before.created_at);
    assert_eq!(inc.updated_at, later);
  }

  #[test]
  fn apply_can_clear_nullable_fields() {
    let mut inc = sample();
    inc.owner = Some("Bob".into());
    let patch = IncidentPatch {
      owner: Some(None),
      ..Default::default()
    };
    let now = inc.updated_at;
    inc.apply(&patch, now);
    assert_eq!(inc.owner, None);
  }

  #[test]
  fn updated_at_never_moves_backwards() {
    let mut inc = sample();
    let prior = inc.updated_at;
    inc.apply(&IncidentPatch::default(), prior - Duration::minutes(1));
    assert_eq!(inc.updated_at, prior);
  }
}
