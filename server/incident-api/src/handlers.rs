//! HTTP handlers for the incident tracker.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use incident_core::validate;
use incident_core::{IncidentView, ListParams, Page};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

pub async fn create_incident(
  State(state): State<Arc<AppState>>,
  body: Bytes,
) -> Result<(StatusCode, Json<IncidentView>), ApiError> {
  let payload = validate::parse_object(&body).inspect_err(|e| warn!("create: {}", e))?;
  let new = validate::validate_create(&payload).inspect_err(|e| warn!("create: {}", e))?;
  let incident = state.incidents.create(new).await?;
  Ok((StatusCode::CREATED, Json(incident.to_view())))
}

/// Query-string problems never fail a listing. Repeated keys keep their
/// first value; bad values fall back to defaults one parameter at a time.
pub async fn list_incidents(
  State(state): State<Arc<AppState>>,
  pairs: Option<Query<Vec<(String, String)>>>,
) -> Result<Json<Page<IncidentView>>, ApiError> {
  let params = pairs
    .map(|Query(pairs)| ListParams::from_pairs(pairs))
    .unwrap_or_default();
  let page = state.incidents.list(&params).await?;
  Ok(Json(page.map(|i| i.to_view())))
}

pub async fn get_incident(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<IncidentView>, ApiError> {
  let incident = state.incidents.get(&id).await?;
  Ok(Json(incident.to_view()))
}

/// Unknown ids are reported before any problem with the body.
pub async fn update_incident(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Bytes,
) -> Result<Json<IncidentView>, ApiError> {
  state.incidents.get(&id).await?;
  let payload = validate::parse_object(&body).inspect_err(|e| warn!(%id, "update: {}", e))?;
  let patch = validate::validate_update(&payload).inspect_err(|e| warn!(%id, "update: {}", e))?;
  let incident = state.incidents.update(&id, patch).await?;
  Ok(Json(incident.to_view()))
}
