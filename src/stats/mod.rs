//! Dashboard aggregates -- counts, severity breakdown, MTTR, daily volume.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Serialize;
use tracing::warn;

use crate::incident::Severity;
use crate::storage::Pool;

const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

/// Incident count for one calendar day (UTC).
#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

/// Summary figures backing the dashboard.
///
/// `incidents_per_day` covers the seven most recent days that saw any
/// incidents, oldest first. `mttr_hours` is `None` until at least one
/// incident has been resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_incidents: i64,
    pub open_incidents: i64,
    pub resolved_incidents: i64,
    pub by_severity: BTreeMap<Severity, i64>,
    pub mttr_hours: Option<f64>,
    pub incidents_per_day: Vec<DayCount>,
}

/// Compute the full dashboard summary from the incidents table.
pub fn dashboard_stats(pool: &Pool) -> Result<DashboardStats> {
    let conn = pool.get()?;

    let total_incidents: i64 = conn
        .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
        .context("counting incidents")?;

    // "Open" here means not yet resolved, so In Progress counts too.
    let open_incidents: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM incidents WHERE status != 'Resolved'",
            [],
            |row| row.get(0),
        )
        .context("counting unresolved incidents")?;

    let resolved_incidents: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM incidents WHERE status = 'Resolved'",
            [],
            |row| row.get(0),
        )
        .context("counting resolved incidents")?;

    let mut by_severity = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT severity, COUNT(*) FROM incidents GROUP BY severity")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (raw, count) = row?;
        match raw.parse::<Severity>() {
            Ok(severity) => {
                by_severity.insert(severity, count);
            }
            // A row we cannot classify should not sink the whole summary.
            Err(e) => warn!(error = %e, "skipping severity bucket"),
        }
    }

    let mttr_hours = mean_time_to_resolve(&conn)?;

    let mut stmt = conn.prepare(
        "SELECT DATE(created_at) as day, COUNT(*) as count
         FROM incidents
         GROUP BY DATE(created_at)
         ORDER BY day DESC
         LIMIT 7",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(DayCount {
            day: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut incidents_per_day = Vec::new();
    for row in rows {
        incidents_per_day.push(row?);
    }
    incidents_per_day.reverse(); // oldest first for charting

    Ok(DashboardStats {
        total_incidents,
        open_incidents,
        resolved_incidents,
        by_severity,
        mttr_hours,
        incidents_per_day,
    })
}

/// Mean wall-clock hours from creation to resolution, rounded to two
/// decimals. `None` when nothing has been resolved yet.
fn mean_time_to_resolve(conn: &rusqlite::Connection) -> Result<Option<f64>> {
    let mut stmt = conn.prepare(
        "SELECT created_at, resolved_at FROM incidents WHERE resolved_at IS NOT NULL",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut total_ms = 0.0;
    let mut resolved = 0u64;
    for row in rows {
        let (created_raw, resolved_raw) = row?;
        let created = DateTime::parse_from_rfc3339(&created_raw);
        let finished = DateTime::parse_from_rfc3339(&resolved_raw);
        match (created, finished) {
            (Ok(created), Ok(finished)) => {
                total_ms += (finished - created).num_milliseconds() as f64;
                resolved += 1;
            }
            _ => warn!(
                created = %created_raw,
                resolved = %resolved_raw,
                "skipping unparseable resolution times"
            ),
        }
    }

    if resolved == 0 {
        return Ok(None);
    }
    let hours = total_ms / resolved as f64 / MS_PER_HOUR;
    Ok(Some((hours * 100.0).round() / 100.0))
}
