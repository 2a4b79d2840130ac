//! Server configuration from the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{var} must be {expected}, got {value:?}")]
  Invalid {
    var: &'static str,
    expected: &'static str,
    value: String,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
  pub host: IpAddr,
  pub port: u16,
  /// Demo incidents to load at start-up. Zero disables seeding.
  pub seed_demo_data: usize,
  /// Postgres connection string. Unset means the in-memory store.
  pub database_url: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: IpAddr::V4(Ipv4Addr::LOCALHOST),
      port: 5000,
      seed_demo_data: 0,
      database_url: None,
    }
  }
}

impl ServerConfig {
  /// Load `.env` if present, then read HOST, PORT, SEED_DEMO_DATA and
  /// DATABASE_URL.
  pub fn from_env() -> Result<Self, ConfigError> {
    let _ = dotenvy::dotenv();
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    let defaults = Self::default();
    Ok(Self {
      host: parse_var(&lookup, "HOST", "an IP address")?.unwrap_or(defaults.host),
      port: parse_var(&lookup, "PORT", "a valid u16")?.unwrap_or(defaults.port),
      seed_demo_data: parse_var(&lookup, "SEED_DEMO_DATA", "a non-negative integer")?
        .unwrap_or(defaults.seed_demo_data),
      database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
    })
  }

  pub fn addr(&self) -> SocketAddr {
    SocketAddr::new(self.host, self.port)
  }
}

fn parse_var<T: std::str::FromStr>(
  lookup: &impl Fn(&str) -> Option<String>,
  var: &'static str,
  expected: &'static str,
) -> Result<Option<T>, ConfigError> {
  match lookup(var) {
    None => Ok(None),
    Some(value) => value
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| ConfigError::Invalid { var, expected, value }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
    let env: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    ServerConfig::from_lookup(|key| env.get(key).cloned())
  }

  #[test]
  fn defaults_when_unset() {
    let cfg = load(&[]).unwrap();
    assert_eq!(cfg, ServerConfig::default());
    assert_eq!(cfg.addr().to_string(), "127.0.0.1:5000");
  }

  #[test]
  fn reads_overrides() {
    let cfg = load(&[("HOST", "0.0.0.0"), ("PORT", "8080"), ("SEED_DEMO_DATA", "200")]).unwrap();
    assert_eq!(cfg.addr().to_string(), "0.0.0.0:8080");
    assert_eq!(cfg.seed_demo_data, 200);
  }

  #[test]
  fn database_url_selects_postgres_only_when_non_blank() {
    let cfg = load(&[("DATABASE_URL", "postgres://tracker@localhost/incidents")]).unwrap();
    assert_eq!(cfg.database_url.as_deref(), Some("postgres://tracker@localhost/incidents"));
    assert_eq!(load(&[("DATABASE_URL", "  ")]).unwrap().database_url, None);
  }

  #[test]
  fn bad_port_is_an_error() {
    let err = load(&[("PORT", "http")]).unwrap_err();
    assert!(err.to_string().contains("PORT"));
    assert!(load(&[("SEED_DEMO_DATA", "-1")]).is_err());
  }
}
