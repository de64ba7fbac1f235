//! Health endpoints for probes and monitoring. None of them require identity.

use std::time::Instant;

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `"healthy"` while the database answers, otherwise `"unhealthy"`.
    pub status: &'static str,
    pub version: &'static str,
    pub database: DatabaseHealth,
    pub completion: CompletionHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replies come from the upstream API or are stored as placeholders.
#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompletionHealth {
    Upstream { model: String },
    Placeholder,
}

/// Full report. Only the database decides the status code; a missing
/// completion API key degrades replies but not the service.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let db_result = state.db.health_check().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    if let Err(e) = &db_result {
        tracing::warn!(error = %e, "Database health check failed");
    }

    let completion = match state.config.completion.api_key() {
        Some(_) => CompletionHealth::Upstream {
            model: state.config.completion.model.clone(),
        },
        None => CompletionHealth::Placeholder,
    };

    let healthy = db_result.is_ok();
    let report = HealthReport {
        status: if healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        database: DatabaseHealth {
            healthy,
            latency_ms,
            error: db_result.err().map(|e| e.to_string()),
        },
        completion,
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// Liveness: the process is serving HTTP.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness: the database is reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.db.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use axum::{Router, body::Body};
    use http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    /// Router over a private shared-cache memory database. `extra` is
    /// appended to the config.
    async fn test_app(extra: &str) -> Router {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let config = crate::config::ThreadchatConfig::from_str(&format!(
            "[database]\ntype = \"sqlite\"\npath = \"file:health_{}?mode=memory&cache=shared\"\nwal_mode = false\n\n{extra}",
            uuid::Uuid::new_v4().simple()
        ))
        .expect("test config");
        let state = crate::AppState::new(config.clone())
            .await
            .expect("app state");
        crate::build_app(&config, state)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_check_with_db_healthy() {
        let app = test_app("").await;

        let (status, body) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let database = &body["database"];
        assert_eq!(database["healthy"], true);
        assert!(database["latency_ms"].is_number());
        assert!(database.get("error").is_none());
    }

    #[tokio::test]
    async fn test_health_reports_placeholder_mode() {
        let app = test_app("").await;
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completion"]["mode"], "placeholder");

        let app = test_app("[completion]\napi_key = \"sk-test\"\nmodel = \"gpt-test\"").await;
        let (_, body) = get_json(&app, "/health").await;
        assert_eq!(body["completion"]["mode"], "upstream");
        assert_eq!(body["completion"]["model"], "gpt-test");
    }

    #[tokio::test]
    async fn test_probes_ok_with_db() {
        let app = test_app("").await;

        let (status, _) = get_json(&app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_json(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_needs_no_identity() {
        // No [auth.identity]: API calls are rejected but probes still answer.
        let app = test_app("").await;

        let (status, _) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(&app, "/api/conversations").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHENTICATED");
    }
}
