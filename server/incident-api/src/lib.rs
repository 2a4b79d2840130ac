//! Incident Tracker API
//!
//! HTTP service exposing create, retrieve, partial update, and a searchable,
//! filterable, sortable, paginated listing of production incidents.

mod bootstrap;
mod config;
mod db;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use bootstrap::{open_store, seed_demo_data, StartupError};
pub use config::{ConfigError, ServerConfig};
pub use db::PgStore;
pub use error::ApiError;
pub use handlers::{create_incident, get_incident, health, list_incidents, update_incident};
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/api/health", get(health))
    .route("/api/incidents", get(list_incidents).post(create_incident))
    .route("/api/incidents/:id", get(get_incident).patch(update_incident))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
