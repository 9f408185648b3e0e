//! Status transition policy -- keeps `resolved_at` paired with `status`.

use chrono::{DateTime, Utc};

use crate::incident::Status;

/// Outcome of applying a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: Status,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Computes the fields to persist for a requested status change.
///
/// Moving to `Resolved` stamps `resolved_at` with `now`; resolving an
/// already-resolved incident refreshes the stamp. Moving to `Open` or
/// `In Progress` clears it, so reopening an incident also clears the
/// resolution time.
pub fn transition(requested: Status, now: DateTime<Utc>) -> Transition {
    let resolved_at = match requested {
        Status::Resolved => Some(now),
        Status::Open | Status::InProgress => None,
    };
    Transition {
        status: requested,
        resolved_at,
    }
}
