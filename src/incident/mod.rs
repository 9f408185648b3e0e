//! Incident domain model -- severity and status enumerations, lifecycle policy.

pub mod lifecycle;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Impact tiers, ordered by ascending impact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Policy: tiers serious enough to warrant a remediation change record.
    pub fn suggests_change(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized severity '{0}' (expected Low, Medium, High or Critical)")]
pub struct InvalidSeverity(pub String);

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Severity::Low),
            "Medium" => Ok(Severity::Medium),
            "High" => Ok(Severity::High),
            "Critical" => Ok(Severity::Critical),
            other => Err(InvalidSeverity(other.to_string())),
        }
    }
}

/// Lifecycle stages of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Open => write!(f, "Open"),
            Status::InProgress => write!(f, "In Progress"),
            Status::Resolved => write!(f, "Resolved"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unrecognized status '{0}' (expected Open, In Progress or Resolved)")]
pub struct InvalidStatus(pub String);

impl FromStr for Status {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(Status::Open),
            "In Progress" => Ok(Status::InProgress),
            "Resolved" => Ok(Status::Resolved),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A tracked anomaly on a named server, from creation to resolution.
///
/// `resolved_at` is non-null exactly when `status` is [`Status::Resolved`];
/// the lifecycle policy maintains that pairing on every transition.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: i64,
    pub server_name: String,
    pub severity: Severity,
    pub status: Status,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub change_suggested: bool,
}

/// Payload for creating an incident. The store assigns the id and stamps
/// `status = Open`, `created_at = now`, `resolved_at = NULL`.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub server_name: String,
    pub severity: Severity,
    pub description: Option<String>,
    pub change_suggested: bool,
}
