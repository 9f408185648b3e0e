//! Incident persistence -- create, filter, and transition incidents.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use crate::incident::{lifecycle, Incident, NewIncident, Severity, Status};
use crate::storage::{Pool, StoreError};

const INCIDENT_COLUMNS: &str =
    "id, server_name, severity, status, description, created_at, resolved_at, change_suggested";

/// Optional constraints applied when listing incidents.
///
/// `None` fields place no constraint; set fields are combined with AND.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub status: Option<Status>,
    pub severity: Option<Severity>,
    pub server_name: Option<String>,
}

/// Handle over the pooled incidents table.
#[derive(Clone)]
pub struct IncidentStore {
    pool: Pool,
}

impl IncidentStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool, for callers that run their own queries.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Insert a new incident and return it as persisted.
    ///
    /// The store assigns the id, stamps `created_at` with the current time
    /// and opens the incident with `status = Open`, `resolved_at = NULL`.
    pub fn create(&self, new: &NewIncident) -> Result<Incident, StoreError> {
        if new.server_name.trim().is_empty() {
            return Err(StoreError::Validation(
                "serverName and severity are required".to_string(),
            ));
        }

        let conn = self.pool.get()?;
        let created_at = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO incidents (server_name, severity, status, description, created_at, change_suggested)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.server_name,
                new.severity.to_string(),
                Status::Open.to_string(),
                new.description,
                created_at,
                new.change_suggested,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, server = %new.server_name, severity = %new.severity, "incident created");
        fetch(&conn, id)
    }

    /// Fetch a single incident by id.
    pub fn get(&self, id: i64) -> Result<Incident, StoreError> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    /// List incidents matching the filter, most recent first.
    pub fn list(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, StoreError> {
        let conn = self.pool.get()?;

        let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(status.to_string());
        }
        if let Some(severity) = filter.severity {
            sql.push_str(" AND severity = ?");
            args.push(severity.to_string());
        }
        if let Some(server) = &filter.server_name {
            sql.push_str(" AND server_name = ?");
            args.push(server.clone());
        }
        sql.push_str(" ORDER BY datetime(created_at) DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), map_row)?;

        let mut incidents = Vec::new();
        for row in rows {
            incidents.push(row?);
        }
        Ok(incidents)
    }

    /// Apply a status change to an existing incident and return the result.
    ///
    /// `resolved_at` follows the lifecycle policy: stamped on `Resolved`,
    /// cleared otherwise.
    pub fn update_status(&self, id: i64, requested: Status) -> Result<Incident, StoreError> {
        let conn = self.pool.get()?;

        // Existence check up front so a bad id reports NotFound, not a no-op.
        fetch(&conn, id)?;

        let t = lifecycle::transition(requested, Utc::now());
        conn.execute(
            "UPDATE incidents SET status = ?1, resolved_at = ?2 WHERE id = ?3",
            params![
                t.status.to_string(),
                t.resolved_at.map(|dt| dt.to_rfc3339()),
                id,
            ],
        )?;

        debug!(id, status = %t.status, "incident status updated");
        fetch(&conn, id)
    }

    /// Delete every incident. Used by the seed utility.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM incidents", [])?;
        Ok(removed)
    }
}

fn fetch(conn: &Connection, id: i64) -> Result<Incident, StoreError> {
    let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1");
    conn.query_row(&sql, [id], map_row).map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    let severity: String = row.get(2)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let resolved_at: Option<String> = row.get(6)?;

    Ok(Incident {
        id: row.get(0)?,
        server_name: row.get(1)?,
        severity: severity.parse().map_err(|e| bad_column(2, e))?,
        status: status.parse().map_err(|e| bad_column(3, e))?,
        description: row.get(4)?,
        created_at: parse_ts(5, &created_at)?,
        resolved_at: resolved_at.as_deref().map(|s| parse_ts(6, s)).transpose()?,
        change_suggested: row.get::<_, i64>(7)? != 0,
    })
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, e))
}

fn bad_column(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_pool;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, IncidentStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, IncidentStore::new(pool))
    }

    fn sample(server: &str, severity: Severity) -> NewIncident {
        NewIncident {
            server_name: server.to_string(),
            severity,
            description: Some(format!("disk alarm on {server}")),
            change_suggested: severity.suggests_change(),
        }
    }

    /// Insert a row with a crafted creation time, bypassing the store's
    /// own stamping.
    fn insert_at(store: &IncidentStore, server: &str, created_at: &str) -> i64 {
        let conn = store.pool().get().unwrap();
        conn.execute(
            "INSERT INTO incidents (server_name, severity, status, created_at, change_suggested)
             VALUES (?1, 'Low', 'Open', ?2, 0)",
            params![server, created_at],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_create_opens_incident() {
        let (_dir, store) = test_store();
        let incident = store.create(&sample("web-1", Severity::High)).unwrap();

        assert!(incident.id > 0);
        assert_eq!(incident.server_name, "web-1");
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.status, Status::Open);
        assert!(incident.resolved_at.is_none());
        assert!(incident.change_suggested);
    }

    #[test]
    fn test_create_rejects_blank_server_name() {
        let (_dir, store) = test_store();
        let err = store.create(&sample("   ", Severity::Low)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(err.to_string(), "serverName and severity are required");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, store) = test_store();
        assert!(matches!(store.get(999), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_list_orders_newest_first() {
        let (_dir, store) = test_store();
        insert_at(&store, "old", "2026-08-01T00:00:00+00:00");
        insert_at(&store, "new", "2026-08-03T00:00:00+00:00");
        insert_at(&store, "mid", "2026-08-02T00:00:00+00:00");

        let listed = store.list(&IncidentFilter::default()).unwrap();
        let names: Vec<&str> = listed.iter().map(|i| i.server_name.as_str()).collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_list_applies_filters_conjunctively() {
        let (_dir, store) = test_store();
        store.create(&sample("web-1", Severity::High)).unwrap();
        store.create(&sample("web-1", Severity::Low)).unwrap();
        let resolved = store.create(&sample("db-1", Severity::High)).unwrap();
        store.update_status(resolved.id, Status::Resolved).unwrap();

        let filter = IncidentFilter {
            severity: Some(Severity::High),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).unwrap().len(), 2);

        let filter = IncidentFilter {
            status: Some(Status::Open),
            severity: Some(Severity::High),
            server_name: Some("web-1".to_string()),
        };
        let listed = store.list(&filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].server_name, "web-1");
        assert_eq!(listed[0].severity, Severity::High);
    }

    #[test]
    fn test_list_unmatched_filter_is_empty() {
        let (_dir, store) = test_store();
        store.create(&sample("web-1", Severity::Low)).unwrap();

        let filter = IncidentFilter {
            server_name: Some("no-such-server".to_string()),
            ..Default::default()
        };
        assert!(store.list(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_stamps_and_reopen_clears() {
        let (_dir, store) = test_store();
        let incident = store.create(&sample("cache-1", Severity::Medium)).unwrap();

        let resolved = store.update_status(incident.id, Status::Resolved).unwrap();
        assert_eq!(resolved.status, Status::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert!(resolved.resolved_at.unwrap() >= incident.created_at);

        let reopened = store.update_status(incident.id, Status::InProgress).unwrap();
        assert_eq!(reopened.status, Status::InProgress);
        assert!(reopened.resolved_at.is_none());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_dir, store) = test_store();
        let err = store.update_status(42, Status::Resolved).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(err.to_string(), "Incident not found");
    }

    #[test]
    fn test_clear_all_empties_table() {
        let (_dir, store) = test_store();
        store.create(&sample("web-1", Severity::Low)).unwrap();
        store.create(&sample("web-2", Severity::Low)).unwrap();

        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list(&IncidentFilter::default()).unwrap().is_empty());
    }
}
