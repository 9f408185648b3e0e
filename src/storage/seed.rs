//! Demo data -- wipes the incidents table and loads a small known set.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use crate::storage::Pool;

struct SampleRow {
    server_name: &'static str,
    severity: &'static str,
    status: &'static str,
    description: &'static str,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    change_suggested: bool,
}

/// Replace all incidents with the sample set and return how many were loaded.
///
/// Destructive: every existing incident is deleted first.
pub fn reset_and_seed(pool: &Pool) -> Result<usize> {
    let now = Utc::now();
    let samples = [
        SampleRow {
            server_name: "web-1",
            severity: "High",
            status: "Open",
            description: "High CPU usage detected on web-1",
            created_at: now,
            resolved_at: None,
            change_suggested: false,
        },
        SampleRow {
            server_name: "db-1",
            severity: "Critical",
            status: "Resolved",
            description: "Database connection timeout spikes",
            created_at: now - Duration::hours(4),
            resolved_at: Some(now - Duration::hours(2)),
            change_suggested: true,
        },
        SampleRow {
            server_name: "cache-1",
            severity: "Medium",
            status: "In Progress",
            description: "Cache miss rate elevated",
            created_at: now - Duration::hours(1),
            resolved_at: None,
            change_suggested: false,
        },
    ];

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM incidents", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO incidents
             (server_name, severity, status, description, created_at, resolved_at, change_suggested)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for row in &samples {
            stmt.execute(params![
                row.server_name,
                row.severity,
                row.status,
                row.description,
                row.created_at.to_rfc3339(),
                row.resolved_at.map(|dt| dt.to_rfc3339()),
                row.change_suggested,
            ])?;
        }
    }
    tx.commit()?;

    Ok(samples.len())
}
