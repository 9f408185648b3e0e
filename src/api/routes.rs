//! API route definitions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::incident::{Incident, NewIncident, Severity, Status};
use crate::stats::{self, DashboardStats};
use crate::storage::incidents::IncidentFilter;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/incidents", get(list_incidents).post(create_incident))
        .route("/incidents/{id}", patch(update_incident))
        .route("/stats", get(get_stats))
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    status: Option<String>,
    severity: Option<String>,
    server_name: Option<String>,
}

impl ListQuery {
    /// Validate the raw query values into a typed filter.
    ///
    /// Empty parameters place no constraint; a non-empty value that does
    /// not name a known status or severity is a client error rather than
    /// a filter that silently matches nothing.
    fn into_filter(self) -> Result<IncidentFilter, ApiError> {
        let status = match non_empty(self.status) {
            Some(raw) => Some(raw.parse::<Status>()?),
            None => None,
        };
        let severity = match non_empty(self.severity) {
            Some(raw) => Some(raw.parse::<Severity>()?),
            None => None,
        };
        Ok(IncidentFilter {
            status,
            severity,
            server_name: non_empty(self.server_name),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIncidentRequest {
    server_name: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    #[serde(default)]
    change_suggested: bool,
}

#[derive(Debug, Deserialize)]
struct UpdateIncidentRequest {
    status: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let filter = query.into_filter()?;
    let incidents = state.store.list(&filter)?;
    Ok(Json(incidents))
}

async fn create_incident(
    State(state): State<AppState>,
    Json(body): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    let (server_name, severity_raw) =
        match (non_empty(body.server_name), non_empty(body.severity)) {
            (Some(server), Some(severity)) => (server, severity),
            _ => {
                return Err(ApiError::BadRequest(
                    "serverName and severity are required".to_string(),
                ))
            }
        };
    let severity: Severity = severity_raw.parse()?;

    let incident = state.store.create(&NewIncident {
        server_name,
        severity,
        description: body.description,
        change_suggested: body.change_suggested,
    })?;

    Ok((StatusCode::CREATED, Json(incident)))
}

async fn update_incident(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateIncidentRequest>,
) -> Result<Json<Incident>, ApiError> {
    let raw = non_empty(body.status)
        .ok_or_else(|| ApiError::BadRequest("status is required".to_string()))?;
    let status: Status = raw.parse()?;

    let incident = state.store.update_status(id, status)?;
    Ok(Json(incident))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    let summary = stats::dashboard_stats(state.store.pool()).map_err(ApiError::Internal)?;
    Ok(Json(summary))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::api::{self, state::AppState};
    use crate::storage::incidents::IncidentStore;
    use crate::storage::open_pool;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        let state = AppState {
            store: IncidentStore::new(pool),
        };
        (dir, api::router(state))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_create_returns_created_incident() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({
                "serverName": "web-1",
                "severity": "High",
                "description": "disk full",
                "changeSuggested": true
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["server_name"], "web-1");
        assert_eq!(body["severity"], "High");
        assert_eq!(body["status"], "Open");
        assert_eq!(body["change_suggested"], true);
        assert!(body["resolved_at"].is_null());
        assert!(body["id"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_create_requires_server_and_severity() {
        let (_dir, app) = test_app();
        for payload in [
            json!({ "severity": "High" }),
            json!({ "serverName": "web-1" }),
            json!({ "serverName": "", "severity": "High" }),
        ] {
            let (status, body) = send(&app, Method::POST, "/api/incidents", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "serverName and severity are required");
        }
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_severity() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({ "serverName": "web-1", "severity": "Severe" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Severe"));
    }

    #[tokio::test]
    async fn test_list_filters_and_rejects_bad_values() {
        let (_dir, app) = test_app();
        for (server, severity) in [("web-1", "High"), ("web-1", "Low"), ("db-1", "High")] {
            send(
                &app,
                Method::POST,
                "/api/incidents",
                Some(json!({ "serverName": server, "severity": severity })),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/api/incidents", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/incidents?severity=High&serverName=web-1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        // Empty parameters place no constraint.
        let (status, body) =
            send(&app, Method::GET, "/api/incidents?status=&severity=", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);

        // A status outside the lifecycle is an error, not an empty result.
        let (status, body) = send(&app, Method::GET, "/api/incidents?status=Closed", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Closed"));
    }

    #[tokio::test]
    async fn test_update_transitions_status() {
        let (_dir, app) = test_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({ "serverName": "cache-1", "severity": "Medium" })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/incidents/{id}"),
            Some(json!({ "status": "Resolved" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Resolved");
        assert!(body["resolved_at"].is_string());

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/incidents/{id}"),
            Some(json!({ "status": "In Progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "In Progress");
        assert!(body["resolved_at"].is_null());
    }

    #[tokio::test]
    async fn test_update_error_cases() {
        let (_dir, app) = test_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({ "serverName": "web-2", "severity": "Low" })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/incidents/{id}"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "status is required");

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/incidents/{id}"),
            Some(json!({ "status": "Escalated" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Escalated"));

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/incidents/9999",
            Some(json!({ "status": "Resolved" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Incident not found");
    }

    #[tokio::test]
    async fn test_stats_reflect_store_contents() {
        let (_dir, app) = test_app();
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({ "serverName": "db-1", "severity": "Critical" })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();
        send(
            &app,
            Method::PATCH,
            &format!("/api/incidents/{id}"),
            Some(json!({ "status": "Resolved" })),
        )
        .await;
        send(
            &app,
            Method::POST,
            "/api/incidents",
            Some(json!({ "serverName": "web-1", "severity": "Low" })),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalIncidents"], 2);
        assert_eq!(body["openIncidents"], 1);
        assert_eq!(body["resolvedIncidents"], 1);
        assert_eq!(body["bySeverity"]["Critical"], 1);
        assert_eq!(body["bySeverity"]["Low"], 1);
        assert!(body["mttrHours"].is_number());
        assert_eq!(body["incidentsPerDay"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_root_and_fallback() {
        let (_dir, app) = test_app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Rackwatch incident dashboard API is running");

        let (status, _) = send(&app, Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
