//! Command layer: create/get/update/list against a storage collaborator.
//!
//! Holds no state of its own beyond the immutable config and a handle to the
//! store. Inputs are already validated (see `validate`).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::TrackerError;
use crate::query::{ListParams, ListQuery};
use crate::store::IncidentStore;
use crate::types::*;

#[derive(Clone)]
pub struct IncidentService {
  config: Config,
  store: Arc<dyn IncidentStore>,
}

impl IncidentService {
  pub fn new(config: Config, store: Arc<dyn IncidentStore>) -> Self {
    Self { config, store }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Persist a new incident with a fresh id and `created_at == updated_at == now`.
  pub async fn create(&self, new: NewIncident) -> Result<Incident, TrackerError> {
    let incident = self.store.create(new, Utc::now()).await?;
    info!(
      id = %incident.id,
      service = %incident.service,
      severity = %incident.severity,
      "incident created"
    );
    Ok(incident)
  }

  pub async fn get(&self, id: &str) -> Result<Incident, TrackerError> {
    let uuid = parse_id(id)?;
    self
      .store
      .get(uuid)
      .await?
      .ok_or_else(|| TrackerError::not_found(id))
  }

  /// Apply the present fields of `patch` and refresh `updated_at`, even when
  /// the patch is empty. Status transitions are not restricted.
  pub async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident, TrackerError> {
    let uuid = parse_id(id)?;
    let incident = self
      .store
      .update(uuid, &patch, Utc::now())
      .await?
      .ok_or_else(|| TrackerError::not_found(id))?;
    info!(id = %incident.id, status = %incident.status, noop = patch.is_empty(), "incident updated");
    Ok(incident)
  }

  pub async fn list(&self, params: &ListParams) -> Result<Page<Incident>, TrackerError> {
    let query = ListQuery::resolve(params, &self.config);
    debug!(?query, "listing incidents");
    self.store.query(&query).await
  }
}

/// Ids that are not UUIDs cannot exist in the store.
fn parse_id(id: &str) -> Result<Uuid, TrackerError> {
  Uuid::parse_str(id).map_err(|_| TrackerError::not_found(id))
}
