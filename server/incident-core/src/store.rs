//! Storage collaborator: the trait the core consumes plus an in-memory store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::query::{self, ListQuery};
use crate::types::*;

/// Persistence operations required by the command layer and query engine.
#[async_trait]
pub trait IncidentStore: Send + Sync {
  async fn create(&self, new: NewIncident, now: DateTime<Utc>) -> Result<Incident, TrackerError>;

  async fn get(&self, id: Uuid) -> Result<Option<Incident>, TrackerError>;

  /// Apply `patch` to one record atomically. `None` if the id is unknown.
  async fn update(
    &self,
    id: Uuid,
    patch: &IncidentPatch,
    now: DateTime<Utc>,
  ) -> Result<Option<Incident>, TrackerError>;

  /// Snapshot of every stored record, in no particular order.
  async fn list(&self) -> Result<Vec<Incident>, TrackerError>;

  async fn count(&self) -> Result<u64, TrackerError>;

  /// Insert records as-is, keeping their ids and timestamps. Ids already
  /// present are left untouched.
  async fn import(&self, incidents: Vec<Incident>) -> Result<u64, TrackerError>;

  /// Filtered, sorted, paginated listing. The default lists everything and
  /// runs the query engine over the snapshot.
  async fn query(&self, query: &ListQuery) -> Result<Page<Incident>, TrackerError> {
    let all = self.list().await?;
    Ok(query::execute(query, all))
  }
}

/// In-memory store. Each record has its own lock so updates to different
/// ids do not wait on each other.
#[derive(Default)]
pub struct MemoryStore {
  records: RwLock<HashMap<Uuid, Arc<Mutex<Incident>>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Preload existing records (seed data, fixtures).
  pub fn with_incidents(incidents: impl IntoIterator<Item = Incident>) -> Self {
    let records = incidents
      .into_iter()
      .map(|i| (i.id, Arc::new(Mutex::new(i))))
      .collect();
    Self {
      records: RwLock::new(records),
    }
  }

  async fn slot(&self, id: Uuid) -> Option<Arc<Mutex<Incident>>> {
    self.records.read().await.get(&id).cloned()
  }
}

#[async_trait]
impl IncidentStore for MemoryStore {
  async fn create(&self, new: NewIncident, now: DateTime<Utc>) -> Result<Incident, TrackerError> {
    let mut records = self.records.write().await;
    let mut incident = Incident::create(new, now);
    // Ids are never reused.
    while records.contains_key(&incident.id) {
      incident.id = Uuid::new_v4();
    }
    records.insert(incident.id, Arc::new(Mutex::new(incident.clone())));
    Ok(incident)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Incident>, TrackerError> {
    match self.slot(id).await {
      Some(slot) => Ok(Some(slot.lock().await.clone())),
      None => Ok(None),
    }
  }

  async fn update(
    &self,
    id: Uuid,
    patch: &IncidentPatch,
    now: DateTime<Utc>,
  ) -> Result<Option<Incident>, TrackerError> {
    let Some(slot) = self.slot(id).await else {
      return Ok(None);
    };
    let mut record = slot.lock().await;
    record.apply(patch, now);
    Ok(Some(record.clone()))
  }

  async fn list(&self) -> Result<Vec<Incident>, TrackerError> {
    let slots: Vec<Arc<Mutex<Incident>>> = self.records.read().await.values().cloned().collect();
    let mut out = Vec::with_capacity(slots.len());
    for slot in slots {
      out.push(slot.lock().await.clone());
    }
    Ok(out)
  }

  async fn count(&self) -> Result<u64, TrackerError> {
    Ok(self.records.read().await.len() as u64)
  }

  async fn import(&self, incidents: Vec<Incident>) -> Result<u64, TrackerError> {
    let mut records = self.records.write().await;
    let mut inserted = 0;
    for incident in incidents {
      if let Entry::Vacant(slot) = records.entry(incident.id) {
        slot.insert(Arc::new(Mutex::new(incident)));
        inserted += 1;
      }
    }
    Ok(inserted)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn new_incident(title: &str) -> NewIncident {
    NewIncident {
      title: title.into(),
      service: "api".into(),
      severity: Severity::Sev3,
      status: Status::Open,
      owner: None,
      summary: None,
    }
  }

  #[tokio::test]
  async fn create_then_get() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let created = store.create(new_incident("first"), now).await.unwrap();
    let fetched = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(created, fetched);
    assert_eq!(store.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn update_unknown_id_is_none() {
    let store = MemoryStore::new();
    let out = store
      .update(Uuid::new_v4(), &IncidentPatch::default(), Utc::now())
      .await
      .unwrap();
    assert!(out.is_none());
  }

  #[tokio::test]
  async fn update_persists() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let created = store.create(new_incident("first"), now).await.unwrap();
    let patch = IncidentPatch {
      title: Some("renamed".into()),
      ..Default::default()
    };
    let later = now + Duration::seconds(1);
    store.update(created.id, &patch, later).await.unwrap();
    let fetched = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "renamed");
    assert_eq!(fetched.updated_at, later);
  }

  #[tokio::test]
  async fn concurrent_updates_on_one_id_all_land() {
    let store = Arc::new(MemoryStore::new());
    let id = store.create(new_incident("race"), Utc::now()).await.unwrap().id;

    let mut handles = Vec::new();
    for i in 0..16 {
      let store = store.clone();
      handles.push(tokio::spawn(async move {
        let patch = if i % 2 == 0 {
          IncidentPatch {
            owner: Some(Some(format!("owner-{}", i))),
            ..Default::default()
          }
        } else {
          IncidentPatch {
            status: Some(Status::Mitigated),
            ..Default::default()
          }
        };
        store.update(id, &patch, Utc::now()).await.unwrap()
      }));
    }
    for h in handles {
      assert!(h.await.unwrap().is_some());
    }

    let fetched = store.get(id).await.unwrap().unwrap();
    assert_eq!(fetched.status, Status::Mitigated);
    assert!(fetched.owner.unwrap().starts_with("owner-"));
    assert!(fetched.updated_at >= fetched.created_at);
  }

  #[tokio::test]
  async fn import_keeps_existing_ids() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let existing = store.create(new_incident("kept"), now).await.unwrap();
    let mut clash = existing.clone();
    clash.title = "replaced".into();
    let fresh = Incident::create(new_incident("fresh"), now);

    let inserted = store.import(vec![clash, fresh.clone()]).await.unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.get(existing.id).await.unwrap().unwrap().title, "kept");
    assert_eq!(store.get(fresh.id).await.unwrap().unwrap(), fresh);
  }

  #[tokio::test]
  async fn held_record_lock_does_not_block_other_ids() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let busy = store.create(new_incident("busy"), now).await.unwrap().id;
    let free = store.create(new_incident("free"), now).await.unwrap().id;
    let patch = IncidentPatch {
      status: Some(Status::Resolved),
      ..Default::default()
    };

    let slot = store.slot(busy).await.unwrap();
    let held = slot.lock().await;

    let limit = std::time::Duration::from_secs(1);
    let updated = tokio::time::timeout(limit, store.update(free, &patch, now))
      .await
      .expect("update on another id waited for the held lock")
      .unwrap()
      .unwrap();
    assert_eq!(updated.status, Status::Resolved);

    let blocked = tokio::time::timeout(std::time::Duration::from_millis(50), store.update(busy, &patch, now)).await;
    assert!(blocked.is_err());

    drop(held);
    let after = store.update(busy, &patch, now).await.unwrap().unwrap();
    assert_eq!(after.status, Status::Resolved);
  }
}
