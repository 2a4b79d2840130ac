//! Binary entrypoint for the incident tracker API.

use std::sync::Arc;

use incident_core::{Config, IncidentService};
use tracing::info;
use tracing_subscriber::EnvFilter;

use incident_api::{open_store, router, seed_demo_data, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let server = ServerConfig::from_env()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "incident_api=info,incident_core=info,tower_http=info".into()),
    )
    .init();

  let store = open_store(&server).await?;
  seed_demo_data(store.as_ref(), server.seed_demo_data).await?;

  let state = Arc::new(AppState {
    incidents: IncidentService::new(Config::default(), store),
  });
  let app = router(state);

  let addr = server.addr();
  info!(%addr, "incident-api listening");

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
