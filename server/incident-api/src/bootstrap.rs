//! Start-up wiring: pick the store and load demo data.

use std::sync::Arc;

use chrono::Utc;
use incident_core::seed::{self, WeightedError};
use incident_core::{IncidentStore, MemoryStore, TrackerError};
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::db::PgStore;

#[derive(Debug, Error)]
pub enum StartupError {
  #[error(transparent)]
  Store(#[from] TrackerError),

  #[error("demo data weights: {0}")]
  Seed(#[from] WeightedError),
}

/// Postgres when `DATABASE_URL` is set (schema created on first use),
/// otherwise a fresh in-memory store.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn IncidentStore>, StartupError> {
  match &config.database_url {
    Some(url) => {
      let store = PgStore::connect(url).await?;
      store.migrate().await?;
      info!("using postgres incident store");
      Ok(Arc::new(store))
    }
    None => {
      info!("DATABASE_URL not set, using in-memory incident store");
      Ok(Arc::new(MemoryStore::new()))
    }
  }
}

/// Load `count` demo incidents unless the store already holds at least that
/// many. Returns how many were inserted.
pub async fn seed_demo_data(store: &dyn IncidentStore, count: usize) -> Result<u64, StartupError> {
  if count == 0 {
    return Ok(0);
  }
  let existing = store.count().await?;
  if existing >= count as u64 {
    info!(existing, "store already populated, skipping seed");
    return Ok(0);
  }
  let inserted = store.import(seed::demo_incidents(count, Utc::now())?).await?;
  info!(inserted, "seeded demo incidents");
  Ok(inserted)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn seeds_an_empty_store() {
    let store = MemoryStore::new();
    assert_eq!(seed_demo_data(&store, 25).await.unwrap(), 25);
    assert_eq!(store.count().await.unwrap(), 25);
  }

  #[tokio::test]
  async fn skips_when_already_populated() {
    let store = MemoryStore::with_incidents(seed::demo_incidents(30, Utc::now()).unwrap());
    assert_eq!(seed_demo_data(&store, 30).await.unwrap(), 0);
    assert_eq!(seed_demo_data(&store, 10).await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 30);

    // A second start with the same setting leaves the data alone.
    let fresh = MemoryStore::new();
    seed_demo_data(&fresh, 12).await.unwrap();
    seed_demo_data(&fresh, 12).await.unwrap();
    assert_eq!(fresh.count().await.unwrap(), 12);
  }

  #[tokio::test]
  async fn zero_disables_seeding() {
    let store = MemoryStore::new();
    assert_eq!(seed_demo_data(&store, 0).await.unwrap(), 0);
    assert_eq!(store.count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn no_database_url_opens_memory_store() {
    let store = open_store(&ServerConfig::default()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
  }
}
