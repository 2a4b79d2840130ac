//! Demo data: plausible incidents for local development.
//!
//! Each record draws from its own `StdRng` seeded by a blake3 digest of its
//! index, so the same `(count, now)` always yields the same content. Ids are
//! fresh.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

pub use rand::distributions::WeightedError;

use crate::types::*;

const SERVICES: [&str; 15] = [
  "auth-service",
  "payment-gateway",
  "user-api",
  "notification-service",
  "order-service",
  "inventory-service",
  "search-service",
  "analytics-pipeline",
  "cdn-edge",
  "billing-service",
  "email-service",
  "cache-layer",
  "api-gateway",
  "logging-service",
  "config-service",
];

const OWNERS: [Option<&str>; 11] = [
  Some("Alice Chen"),
  Some("Bob Martinez"),
  Some("Carol Park"),
  Some("David Kim"),
  Some("Eva Johansson"),
  Some("Frank Liu"),
  Some("Grace Okafor"),
  Some("Henry Singh"),
  Some("Irene Rossi"),
  Some("James Brown"),
  None,
];

const TITLES: [&str; 15] = [
  "{service} returning 5xx errors",
  "High latency on {service}",
  "{service} memory leak detected",
  "Connection pool exhaustion in {service}",
  "{service} deployment rollback",
  "Certificate expiry warning for {service}",
  "Database replication lag in {service}",
  "{service} disk usage above 90%",
  "Rate limiting triggered on {service}",
  "DNS resolution failures for {service}",
  "{service} pod crash loop",
  "Upstream timeout from {service}",
  "{service} data inconsistency detected",
  "Scheduled maintenance for {service}",
  "Security patch required for {service}",
];

const SUMMARIES: [Option<&str>; 8] = [
  Some("Monitoring detected anomalous behaviour. Investigation is underway."),
  Some("Users reported degraded experience. On-call engineer paged."),
  Some("Automated alerts fired at {time}. Root cause under analysis."),
  Some("Deployment triggered unexpected side-effects. Rolling back."),
  Some("Third-party dependency outage impacting {service}."),
  Some("Capacity limits reached during peak traffic window."),
  Some("Configuration drift identified after recent release."),
  None,
];

/// SEV1 is rare.
const SEVERITY_WEIGHTS: [(Severity, u32); 4] = [
  (Severity::Sev1, 5),
  (Severity::Sev2, 15),
  (Severity::Sev3, 40),
  (Severity::Sev4, 40),
];

const STATUS_WEIGHTS: [(Status, u32); 3] = [
  (Status::Open, 30),
  (Status::Mitigated, 30),
  (Status::Resolved, 40),
];

const CREATED_WINDOW_SECS: i64 = 90 * 24 * 3600;
const UPDATE_LAG_MINUTES: i64 = 3 * 24 * 60;

struct Weights {
  severity: WeightedIndex<u32>,
  status: WeightedIndex<u32>,
}

impl Weights {
  fn new() -> Result<Self, WeightedError> {
    Ok(Self {
      severity: WeightedIndex::new(SEVERITY_WEIGHTS.iter().map(|(_, w)| *w))?,
      status: WeightedIndex::new(STATUS_WEIGHTS.iter().map(|(_, w)| *w))?,
    })
  }
}

/// Generate `count` demo incidents ending no later than `now`.
pub fn demo_incidents(count: usize, now: DateTime<Utc>) -> Result<Vec<Incident>, WeightedError> {
  let weights = Weights::new()?;
  Ok(
    (0..count)
      .map(|i| demo_incident(&mut record_rng(i as u64), &weights, now))
      .collect(),
  )
}

fn demo_incident(rng: &mut StdRng, weights: &Weights, now: DateTime<Utc>) -> Incident {
  let service = SERVICES[rng.gen_range(0..SERVICES.len())];
  let created = now - Duration::seconds(rng.gen_range(0..=CREATED_WINDOW_SECS));
  let updated = (created + Duration::minutes(rng.gen_range(0..=UPDATE_LAG_MINUTES))).min(now);

  let title = TITLES[rng.gen_range(0..TITLES.len())].replace("{service}", service);
  let summary = SUMMARIES[rng.gen_range(0..SUMMARIES.len())].map(|tpl| {
    tpl
      .replace("{service}", service)
      .replace("{time}", &created.format("%H:%M UTC").to_string())
  });
  let owner = OWNERS[rng.gen_range(0..OWNERS.len())].map(String::from);

  Incident {
    id: Uuid::new_v4(),
    title,
    service: service.to_string(),
    severity: SEVERITY_WEIGHTS[weights.severity.sample(rng)].0,
    status: STATUS_WEIGHTS[weights.status.sample(rng)].0,
    owner,
    summary,
    created_at: created,
    updated_at: updated,
  }
}

/// One generator per record index, seeded from a blake3 digest.
fn record_rng(index: u64) -> StdRng {
  let mut hasher = blake3::Hasher::new();
  hasher.update(b"demo-incident|");
  hasher.update(&index.to_le_bytes());
  StdRng::from_seed(*hasher.finalize().as_bytes())
}
