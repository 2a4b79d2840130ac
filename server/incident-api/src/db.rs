//! Postgres-backed incident store.
//!
//! Listing runs in SQL: filters become a WHERE clause, the sort key maps to a
//! fixed column, and LIMIT/OFFSET slice the page. Text columns order with
//! `COLLATE "C"` so results match the in-memory engine byte for byte.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use incident_core::{
  Incident, IncidentPatch, IncidentStore, ListQuery, NewIncident, Page, Severity, SortKey, SortOrder, Status,
  TrackerError,
};
use sqlx_core::query::{query, Query};
use sqlx_core::query_builder::QueryBuilder;
use sqlx_core::query_scalar::query_scalar;
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use tracing::info;
use uuid::Uuid;

const SCHEMA: [&str; 5] = [
  r#"
  CREATE TABLE IF NOT EXISTS incidents (
    id UUID PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    service VARCHAR(120) NOT NULL,
    severity VARCHAR(4) NOT NULL CHECK (severity IN ('SEV1', 'SEV2', 'SEV3', 'SEV4')),
    status VARCHAR(10) NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'MITIGATED', 'RESOLVED')),
    owner VARCHAR(120),
    summary TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
  )
  "#,
  "CREATE INDEX IF NOT EXISTS incidents_severity_idx ON incidents (severity)",
  "CREATE INDEX IF NOT EXISTS incidents_status_idx ON incidents (status)",
  "CREATE INDEX IF NOT EXISTS incidents_service_idx ON incidents (service)",
  "CREATE INDEX IF NOT EXISTS incidents_created_at_idx ON incidents (created_at)",
];

const SELECT_ALL: &str =
  "SELECT id, title, service, severity, status, owner, summary, created_at, updated_at FROM incidents";

const SELECT_FOR_UPDATE: &str = "SELECT id, title, service, severity, status, owner, summary, created_at, updated_at \
   FROM incidents WHERE id = $1 FOR UPDATE";

const SELECT_ONE: &str =
  "SELECT id, title, service, severity, status, owner, summary, created_at, updated_at FROM incidents WHERE id = $1";

const INSERT: &str = r#"
  INSERT INTO incidents (id, title, service, severity, status, owner, summary, created_at, updated_at)
  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
  ON CONFLICT (id) DO NOTHING
"#;

const UPDATE: &str = r#"
  UPDATE incidents SET
    title = $2, service = $3, severity = $4, status = $5, owner = $6, summary = $7, updated_at = $8
  WHERE id = $1
"#;

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> Result<Self, TrackerError> {
    let pool = PgPoolOptions::new()
      .max_connections(5)
      .connect(database_url)
      .await
      .map_err(db_error)?;
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Create the table and its indexes if they do not exist yet.
  pub async fn migrate(&self) -> Result<(), TrackerError> {
    for statement in SCHEMA {
      query::<Postgres>(statement)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
    }
    info!("incidents schema ready");
    Ok(())
  }
}

#[async_trait]
impl IncidentStore for PgStore {
  async fn create(&self, new: NewIncident, now: DateTime<Utc>) -> Result<Incident, TrackerError> {
    let incident = Incident::create(new, now.trunc_subsecs(6));
    let inserted = insert(&incident)
      .execute(&self.pool)
      .await
      .map_err(db_error)?;
    if inserted.rows_affected() == 0 {
      return Err(TrackerError::storage(format!("incident id {} already taken", incident.id)));
    }
    Ok(incident)
  }

  async fn get(&self, id: Uuid) -> Result<Option<Incident>, TrackerError> {
    let row = query::<Postgres>(SELECT_ONE)
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_error)?;
    row.as_ref().map(incident_from_row).transpose()
  }

  async fn update(
    &self,
    id: Uuid,
    patch: &IncidentPatch,
    now: DateTime<Utc>,
  ) -> Result<Option<Incident>, TrackerError> {
    let mut tx = self.pool.begin().await.map_err(db_error)?;
    let row = query::<Postgres>(SELECT_FOR_UPDATE)
      .bind(id)
      .fetch_optional(&mut *tx)
      .await
      .map_err(db_error)?;
    let Some(row) = row else {
      return Ok(None);
    };

    let mut incident = incident_from_row(&row)?;
    incident.apply(patch, now.trunc_subsecs(6));
    query::<Postgres>(UPDATE)
      .bind(incident.id)
      .bind(incident.title.as_str())
      .bind(incident.service.as_str())
      .bind(incident.severity.as_str())
      .bind(incident.status.as_str())
      .bind(incident.owner.as_deref())
      .bind(incident.summary.as_deref())
      .bind(incident.updated_at)
      .execute(&mut *tx)
      .await
      .map_err(db_error)?;
    tx.commit().await.map_err(db_error)?;
    Ok(Some(incident))
  }

  async fn list(&self) -> Result<Vec<Incident>, TrackerError> {
    let rows = query::<Postgres>(SELECT_ALL)
      .fetch_all(&self.pool)
      .await
      .map_err(db_error)?;
    rows.iter().map(incident_from_row).collect()
  }

  async fn count(&self) -> Result<u64, TrackerError> {
    let n: i64 = query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM incidents")
      .fetch_one(&self.pool)
      .await
      .map_err(db_error)?;
    Ok(n.max(0) as u64)
  }

  async fn import(&self, incidents: Vec<Incident>) -> Result<u64, TrackerError> {
    let mut tx = self.pool.begin().await.map_err(db_error)?;
    let mut inserted = 0;
    for incident in &incidents {
      let done = insert(incident).execute(&mut *tx).await.map_err(db_error)?;
      inserted += done.rows_affected();
    }
    tx.commit().await.map_err(db_error)?;
    Ok(inserted)
  }

  async fn query(&self, spec: &ListQuery) -> Result<Page<Incident>, TrackerError> {
    let total: i64 = count_builder(spec)
      .build_query_scalar::<i64>()
      .fetch_one(&self.pool)
      .await
      .map_err(db_error)?;
    let rows = select_builder(spec)
      .build()
      .fetch_all(&self.pool)
      .await
      .map_err(db_error)?;
    let items = rows.iter().map(incident_from_row).collect::<Result<Vec<_>, _>>()?;
    Ok(spec.paginate(items, total.max(0) as u64))
  }
}

// ---------------------------------------------------------------------------
// SQL construction
// ---------------------------------------------------------------------------

fn insert(incident: &Incident) -> Query<'_, Postgres, PgArguments> {
  query::<Postgres>(INSERT)
    .bind(incident.id)
    .bind(incident.title.as_str())
    .bind(incident.service.as_str())
    .bind(incident.severity.as_str())
    .bind(incident.status.as_str())
    .bind(incident.owner.as_deref())
    .bind(incident.summary.as_deref())
    .bind(incident.created_at)
    .bind(incident.updated_at)
}

fn count_builder(spec: &ListQuery) -> QueryBuilder<'static, Postgres> {
  let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM incidents");
  push_filters(&mut qb, spec);
  qb
}

fn select_builder(spec: &ListQuery) -> QueryBuilder<'static, Postgres> {
  let mut qb = QueryBuilder::new(SELECT_ALL);
  push_filters(&mut qb, spec);
  qb.push(" ORDER BY ")
    .push(order_column(spec.sort))
    .push(match spec.order {
      SortOrder::Asc => " ASC NULLS FIRST",
      SortOrder::Desc => " DESC NULLS LAST",
    })
    .push(", id ASC LIMIT ")
    .push_bind(i64::try_from(spec.per_page).unwrap_or(i64::MAX))
    .push(" OFFSET ")
    .push_bind(i64::try_from(spec.offset()).unwrap_or(i64::MAX));
  qb
}

/// Every active filter, AND-ed. Values are always bound, never spliced.
fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, spec: &ListQuery) {
  let mut sep = " WHERE ";

  if let Some(needle) = &spec.search {
    qb.push(sep)
      .push("(strpos(lower(title), ")
      .push_bind(needle.clone())
      .push(") > 0 OR strpos(lower(service), ")
      .push_bind(needle.clone())
      .push(") > 0 OR strpos(lower(COALESCE(owner, '')), ")
      .push_bind(needle.clone())
      .push(") > 0)");
    sep = " AND ";
  }
  if !spec.severities.is_empty() {
    let severities: Vec<String> = spec.severities.iter().map(|s| s.as_str().to_string()).collect();
    qb.push(sep).push("severity = ANY(").push_bind(severities).push(")");
    sep = " AND ";
  }
  if !spec.statuses.is_empty() {
    let statuses: Vec<String> = spec.statuses.iter().map(|s| s.as_str().to_string()).collect();
    qb.push(sep).push("status = ANY(").push_bind(statuses).push(")");
    sep = " AND ";
  }
  if let Some(needle) = &spec.service {
    qb.push(sep)
      .push("strpos(lower(service), ")
      .push_bind(needle.clone())
      .push(") > 0");
  }
}

fn order_column(key: SortKey) -> &'static str {
  match key {
    SortKey::Title => r#"title COLLATE "C""#,
    SortKey::Service => r#"service COLLATE "C""#,
    SortKey::Severity => r#"severity COLLATE "C""#,
    SortKey::Status => r#"status COLLATE "C""#,
    SortKey::Owner => r#"owner COLLATE "C""#,
    SortKey::CreatedAt => "created_at",
    SortKey::UpdatedAt => "updated_at",
  }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn incident_from_row(row: &PgRow) -> Result<Incident, TrackerError> {
  let severity: String = row.try_get("severity").map_err(db_error)?;
  let status: String = row.try_get("status").map_err(db_error)?;
  Ok(Incident {
    id: row.try_get("id").map_err(db_error)?,
    title: row.try_get("title").map_err(db_error)?,
    service: row.try_get("service").map_err(db_error)?,
    severity: Severity::parse(&severity)
      .ok_or_else(|| TrackerError::storage(format!("unknown severity {:?} in incidents", severity)))?,
    status: Status::parse(&status)
      .ok_or_else(|| TrackerError::storage(format!("unknown status {:?} in incidents", status)))?,
    owner: row.try_get("owner").map_err(db_error)?,
    summary: row.try_get("summary").map_err(db_error)?,
    created_at: row.try_get("created_at").map_err(db_error)?,
    updated_at: row.try_get("updated_at").map_err(db_error)?,
  })
}

fn db_error(e: sqlx_core::Error) -> TrackerError {
  TrackerError::storage(e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use incident_core::{Config, ListParams};

  fn resolve(pairs: &[(&str, &str)]) -> ListQuery {
    ListQuery::resolve(&ListParams::from_pairs(pairs.iter().copied()), &Config::default())
  }

  #[test]
  fn unfiltered_listing_has_no_where_clause() {
    let qb = select_builder(&resolve(&[]));
    assert_eq!(
      qb.sql(),
      format!("{} ORDER BY created_at DESC NULLS LAST, id ASC LIMIT $1 OFFSET $2", SELECT_ALL)
    );
    assert_eq!(count_builder(&resolve(&[])).sql(), "SELECT COUNT(*) FROM incidents");
  }

  #[test]
  fn filters_are_bound_and_and_ed() {
    let query = resolve(&[
      ("search", "Pay'; DROP TABLE incidents"),
      ("severity", "SEV1,SEV2"),
      ("status", "open"),
      ("service", "gateway"),
      ("sortBy", "title"),
      ("order", "asc"),
    ]);
    let qb = select_builder(&query);
    let sql = qb.sql();
    assert!(!sql.contains("DROP"));
    assert!(!sql.contains("SEV1"));
    assert!(sql.contains(" WHERE (strpos(lower(title), $1) > 0"));
    assert!(sql.contains(" AND severity = ANY($4) AND status = ANY($5) AND strpos(lower(service), $6) > 0"));
    assert!(sql.ends_with(r#" ORDER BY title COLLATE "C" ASC NULLS FIRST, id ASC LIMIT $7 OFFSET $8"#));

    let count = count_builder(&query);
    assert!(count.sql().starts_with("SELECT COUNT(*) FROM incidents WHERE ("));
    assert!(!count.sql().contains("LIMIT"));
  }

  #[test]
  fn every_sort_key_maps_to_a_fixed_column() {
    for (name, column) in [
      ("owner", r#"owner COLLATE "C""#),
      ("severity", r#"severity COLLATE "C""#),
      ("updatedAt", "updated_at"),
      ("owner; DELETE", "created_at"),
    ] {
      let qb = select_builder(&resolve(&[("sortBy", name)]));
      assert!(qb.sql().contains(&format!(" ORDER BY {} DESC NULLS LAST", column)), "{}", name);
    }
  }
}
