use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct HealthState {
    project_id: String,
    endpoint: String,
    language_code: String,
}

impl HealthState {
    pub fn new(
        project_id: impl Into<String>,
        endpoint: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: endpoint.into(),
            language_code: language_code.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub nlu: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

/// The NLU client is built before any listener starts, so a running process
/// always reports it as configured. Reachability is not probed.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "chatbot-server runtime initialized".to_string(),
        },
        nlu: HealthCheck {
            status: "configured",
            detail: format!(
                "project `{}` via {} ({})",
                state.project_id, state.endpoint, state.language_code
            ),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    fn state() -> HealthState {
        HealthState::new("tutorialchatbot-d4db0", "https://dialogflow.googleapis.com", "en")
    }

    #[tokio::test]
    async fn health_reports_ready_with_nlu_target() {
        let (status, Json(payload)) = health(State(state())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.nlu.status, "configured");
        assert!(payload.nlu.detail.contains("tutorialchatbot-d4db0"));
        assert!(payload.nlu.detail.contains("https://dialogflow.googleapis.com"));
    }

    #[tokio::test]
    async fn health_route_is_served_on_get() {
        let request =
            Request::builder().method("GET").uri("/health").body(Body::empty()).expect("request");

        let response = router(state()).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["status"], "ready");
        assert!(body["checked_at"].as_str().is_some());
    }
}
