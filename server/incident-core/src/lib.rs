//! Incident tracker core: validation, query engine, and command layer.
//!
//! Turns untrusted create/update payloads and list parameters into validated
//! records and bounded, deterministic pages over an incident collection.
//! Persistence is a collaborator behind `IncidentStore`; no HTTP here.

pub mod config;
pub mod error;
pub mod query;
pub mod seed;
pub mod service;
pub mod store;
pub mod types;
pub mod validate;

pub use config::Config;
pub use error::{TrackerError, ValidationError};
pub use query::{ListParams, ListQuery, SortKey, SortOrder};
pub use service::IncidentService;
pub use store::{IncidentStore, MemoryStore};
pub use types::{Incident, IncidentPatch, IncidentView, NewIncident, Page, Severity, Status};
