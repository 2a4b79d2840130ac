//! Query engine: turns untrusted list parameters into a bounded, deterministic page.
//!
//! Resolution never fails. Unknown sort columns, directions, and enum tokens
//! fall back to defaults so that listing stays permissive.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::config::Config;
use crate::types::*;

// ---------------------------------------------------------------------------
// Inbound parameters (raw strings, as received)
// ---------------------------------------------------------------------------

/// Raw list query parameters. Unknown parameters are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub page: Option<String>,
  #[serde(default, rename = "perPage", alias = "per_page")]
  pub per_page: Option<String>,
  #[serde(default)]
  pub search: Option<String>,
  #[serde(default)]
  pub severity: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub service: Option<String>,
  #[serde(default, rename = "sortBy", alias = "sort_by")]
  pub sort_by: Option<String>,
  #[serde(default)]
  pub order: Option<String>,
}

impl ListParams {
  /// Build from raw query-string pairs. The first occurrence of a key wins;
  /// later repeats and unknown keys are ignored.
  pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: AsRef<str>,
    V: Into<String>,
  {
    let mut params = Self::default();
    for (key, value) in pairs {
      let slot = match key.as_ref() {
        "page" => &mut params.page,
        "perPage" | "per_page" => &mut params.per_page,
        "search" => &mut params.search,
        "severity" => &mut params.severity,
        "status" => &mut params.status,
        "service" => &mut params.service,
        "sortBy" | "sort_by" => &mut params.sort_by,
        "order" => &mut params.order,
        _ => continue,
      };
      if slot.is_none() {
        *slot = Some(value.into());
      }
    }
    params
  }
}

// ---------------------------------------------------------------------------
// Resolved query specification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  Title,
  Service,
  Severity,
  Status,
  Owner,
  CreatedAt,
  UpdatedAt,
}

impl SortKey {
  /// Map a column name to a key. Unrecognized names resolve to `CreatedAt`.
  pub fn resolve(name: Option<&str>) -> Self {
    match name {
      Some("title") => Self::Title,
      Some("service") => Self::Service,
      Some("severity") => Self::Severity,
      Some("status") => Self::Status,
      Some("owner") => Self::Owner,
      Some("updatedAt") => Self::UpdatedAt,
      _ => Self::CreatedAt,
    }
  }

  /// Ascending comparison of two incidents on this key.
  ///
  /// Enum columns compare by their stored spelling. A missing owner sorts
  /// before any owner.
  pub fn compare(self, a: &Incident, b: &Incident) -> Ordering {
    match self {
      Self::Title => a.title.cmp(&b.title),
      Self::Service => a.service.cmp(&b.service),
      Self::Severity => a.severity.as_str().cmp(b.severity.as_str()),
      Self::Status => a.status.as_str().cmp(b.status.as_str()),
      Self::Owner => a.owner.cmp(&b.owner),
      Self::CreatedAt => a.created_at.cmp(&b.created_at),
      Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  Desc,
}

impl SortOrder {
  /// `asc` in any case is ascending; everything else is descending.
  pub fn resolve(raw: Option<&str>) -> Self {
    match raw {
      Some(s) if s.eq_ignore_ascii_case("asc") => Self::Asc,
      _ => Self::Desc,
    }
  }
}

/// Fully resolved list specification.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
  pub page: u64,
  pub per_page: u64,
  /// Lowercased search text.
  pub search: Option<String>,
  pub severities: Vec<Severity>,
  pub statuses: Vec<Status>,
  /// Lowercased service substring.
  pub service: Option<String>,
  pub sort: SortKey,
  pub order: SortOrder,
}

impl ListQuery {
  pub fn resolve(params: &ListParams, config: &Config) -> Self {
    let page = positive(params.page.as_deref()).unwrap_or(1);
    let per_page = positive(params.per_page.as_deref())
      .unwrap_or(config.default_per_page)
      .min(config.max_per_page)
      .max(1);

    Self {
      page,
      per_page,
      search: non_blank(params.search.as_deref()),
      severities: tokens(params.severity.as_deref(), Severity::parse),
      statuses: tokens(params.status.as_deref(), Status::parse),
      service: non_blank(params.service.as_deref()),
      sort: SortKey::resolve(params.sort_by.as_deref()),
      order: SortOrder::resolve(params.order.as_deref()),
    }
  }

  /// AND-composition of every active filter.
  pub fn matches(&self, incident: &Incident) -> bool {
    if let Some(needle) = &self.search {
      let hit = contains_ci(&incident.title, needle)
        || contains_ci(&incident.service, needle)
        || incident.owner.as_deref().is_some_and(|o| contains_ci(o, needle));
      if !hit {
        return false;
      }
    }
    if !self.severities.is_empty() && !self.severities.contains(&incident.severity) {
      return false;
    }
    if !self.statuses.is_empty() && !self.statuses.contains(&incident.status) {
      return false;
    }
    if let Some(needle) = &self.service {
      if !contains_ci(&incident.service, needle) {
        return false;
      }
    }
    true
  }

  /// Order on the resolved key and direction, then by id ascending.
  pub fn compare(&self, a: &Incident, b: &Incident) -> Ordering {
    let primary = self.sort.compare(a, b);
    let primary = match self.order {
      SortOrder::Asc => primary,
      SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
  }

  /// Number of matching records before the requested page.
  pub fn offset(&self) -> u64 {
    (self.page - 1).saturating_mul(self.per_page)
  }

  /// Wrap one page of already sorted items with paging metadata.
  pub fn paginate<T>(&self, items: Vec<T>, total: u64) -> Page<T> {
    Page {
      items,
      total,
      page: self.page,
      per_page: self.per_page,
      total_pages: total.div_ceil(self.per_page),
    }
  }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Filter, sort, and slice a collection snapshot.
pub fn execute(query: &ListQuery, incidents: Vec<Incident>) -> Page<Incident> {
  let mut matched: Vec<Incident> = incidents.into_iter().filter(|i| query.matches(i)).collect();
  matched.sort_by(|a, b| query.compare(a, b));

  let total = matched.len() as u64;
  let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
  let limit = usize::try_from(query.per_page).unwrap_or(usize::MAX);

  let items: Vec<Incident> = matched.into_iter().skip(offset).take(limit).collect();
  query.paginate(items, total)
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// Positive integer or `None` (missing, unparseable, zero, negative).
fn positive(raw: Option<&str>) -> Option<u64> {
  raw
    .and_then(|s| s.trim().parse::<i64>().ok())
    .filter(|&n| n > 0)
    .map(|n| n as u64)
}

fn non_blank(raw: Option<&str>) -> Option<String> {
  raw
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_lowercase)
}

/// Comma-separated enum tokens; unknown tokens are dropped.
fn tokens<T: PartialEq>(raw: Option<&str>, parse: fn(&str) -> Option<T>) -> Vec<T> {
  let mut out = Vec::new();
  for token in raw.unwrap_or_default().split(',') {
    let token = token.trim().to_uppercase();
    if let Some(v) = parse(&token) {
      if !out.contains(&v) {
        out.push(v);
      }
    }
  }
  out
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
  haystack.to_lowercase().contains(lowered_needle)
}
