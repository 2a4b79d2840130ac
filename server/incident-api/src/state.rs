//! Shared application state.

use incident_core::IncidentService;

pub struct AppState {
  pub incidents: IncidentService,
}
