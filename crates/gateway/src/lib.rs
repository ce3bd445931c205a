//! HTTP gateway for murmur.
//!
//! Thin axum handlers over [`AgentService`]. Every operation answers `200`
//! with its summary JSON; `success = false` in the body is how failures show.

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use axum::body::Bytes;
use murmur_agent::AgentService;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state behind every route.
pub struct GatewayState {
    pub service: Arc<AgentService>,
    /// Consumer secret used to answer webhook CRC challenges
    pub crc_secret: Option<String>,
}

type SharedState = Arc<GatewayState>;

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/trigger-post", post(trigger_post_handler))
        .route("/trigger-agent", post(trigger_agent_handler))
        .route("/check-mentions", get(check_mentions_handler))
        .route("/process-mentions", post(process_mentions_handler))
        .route("/tier-status", get(tier_status_handler))
        .route("/tier-refresh", post(tier_refresh_handler))
        .route("/tier-resume", post(tier_resume_handler))
        .route("/webhook/mentions", get(crc_handler).post(webhook_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process stops.
pub async fn serve(addr: &str, state: SharedState) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await
}

// --- Handlers ---

async fn health_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.health().await).into_response()
}

async fn metrics_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.metrics().await).into_response()
}

async fn trigger_post_handler(State(state): State<SharedState>) -> Response {
    info!("Batch cycle triggered over HTTP");
    Json(state.service.run_batch().await).into_response()
}

async fn trigger_agent_handler(State(state): State<SharedState>) -> Response {
    info!("Continuous cycle triggered over HTTP");
    Json(state.service.run_continuous().await).into_response()
}

#[derive(Deserialize)]
struct CheckQuery {
    #[serde(default = "default_dry_run")]
    dry_run: bool,
}

fn default_dry_run() -> bool {
    true
}

async fn check_mentions_handler(State(state): State<SharedState>, Query(query): Query<CheckQuery>) -> Response {
    Json(state.service.check_mentions(query.dry_run).await).into_response()
}

async fn process_mentions_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.process_mentions().await).into_response()
}

async fn tier_status_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.tier_status().await).into_response()
}

async fn tier_refresh_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.refresh_tier().await).into_response()
}

async fn tier_resume_handler(State(state): State<SharedState>) -> Response {
    Json(state.service.resume().await).into_response()
}

#[derive(Deserialize)]
struct CrcQuery {
    crc_token: Option<String>,
}

async fn crc_handler(State(state): State<SharedState>, Query(query): Query<CrcQuery>) -> Response {
    let Some(token) = query.crc_token.filter(|t| !t.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "missing crc_token" }))).into_response();
    };
    let Some(secret) = state.crc_secret.as_deref() else {
        warn!("CRC challenge received but no consumer secret is configured");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "api secret not configured" }))).into_response();
    };
    match murmur_social::crc_response_token(secret, &token) {
        Ok(response_token) => Json(json!({ "response_token": response_token })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

/// Acknowledge pushed events. Mentions are still picked up by polling.
async fn webhook_handler(body: Bytes) -> Response {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => {
            let events = payload
                .get("tweet_create_events")
                .and_then(|e| e.as_array())
                .map_or(0, Vec::len);
            info!(events, bytes = body.len(), "Webhook event received");
        }
        Err(e) => warn!(error = %e, bytes = body.len(), "Webhook body is not JSON"),
    }
    Json(json!({ "status": "received" })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use murmur_agent::{AgentSettings, Runtime};
    use murmur_core::error::SocialError;
    use murmur_core::event::EventBus;
    use murmur_core::provider::Provider;
    use murmur_gate::{CapabilityGate, ProbeOutcome, UsageProbe};
    use murmur_ledger::SqliteLedger;
    use murmur_providers::ScriptedProvider;
    use murmur_social::RecordingClient;
    use murmur_tools::{ToolContext, ToolSettings, default_registry};
    use serde_json::Value;
    use tower::ServiceExt;

    struct ForbiddenProbe;

    #[async_trait]
    impl UsageProbe for ForbiddenProbe {
        async fn probe(&self) -> Result<ProbeOutcome, SocialError> {
            Ok(ProbeOutcome::Forbidden)
        }
    }

    async fn test_state(provider: ScriptedProvider) -> SharedState {
        let settings = ToolSettings::default();
        let provider: Arc<dyn Provider> = Arc::new(provider);
        let ledger = Arc::new(SqliteLedger::in_memory().await.unwrap());
        let gate = Arc::new(CapabilityGate::new(Arc::new(ForbiddenProbe), settings.allow_mentions()));
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(default_registry(&settings));
        let ctx = ToolContext::new(provider, Arc::new(RecordingClient::new()), ledger, gate, settings);
        let agent_settings = AgentSettings::default();
        Arc::new(GatewayState {
            service: Arc::new(AgentService::new(Runtime::new(ctx, registry, agent_settings, events))),
            crc_secret: Some("secret".into()),
        })
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(ScriptedProvider::new(vec![])).await);
        let (status, body) = call(app, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ledger"], true);
    }

    #[tokio::test]
    async fn trigger_post_returns_summary() {
        let provider = ScriptedProvider::from_texts([r#"{"plan": []}"#, r#"{"post_text": "from http"}"#]);
        let app = build_router(test_state(provider).await);
        let (status, body) = call(app, "POST", "/trigger-post").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["text"], "from http");
    }

    #[tokio::test]
    async fn failures_are_still_200() {
        // The forbidden probe downgrades to free, which has no mention access.
        let app = build_router(test_state(ScriptedProvider::new(vec![])).await);
        let (status, body) = call(app, "POST", "/process-mentions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "mentions_blocked: mentions_not_available_on_free_tier");
    }

    #[tokio::test]
    async fn crc_challenge() {
        let state = test_state(ScriptedProvider::new(vec![])).await;
        let (status, body) = call(build_router(state.clone()), "GET", "/webhook/mentions?crc_token=challenge").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response_token"], "sha256=oeUF6Wxqoezggrue+wbIDxKRPSF6esKwizR2MHh9HaA=");

        let (status, _) = call(build_router(state), "GET", "/webhook/mentions").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_post_acknowledges() {
        let app = build_router(test_state(ScriptedProvider::new(vec![])).await);
        let req = Request::builder()
            .method("POST")
            .uri("/webhook/mentions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"tweet_create_events": [{}]}"#))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tier_routes() {
        let state = test_state(ScriptedProvider::new(vec![])).await;
        let (_, status) = call(build_router(state.clone()), "GET", "/tier-status").await;
        assert_eq!(status["tier"], "unknown");

        let (_, refreshed) = call(build_router(state.clone()), "POST", "/tier-refresh").await;
        assert_eq!(refreshed["outcome"]["outcome"], "downgraded");
        assert_eq!(refreshed["status"]["tier"], "free");

        let (_, resumed) = call(build_router(state), "POST", "/tier-resume").await;
        assert_eq!(resumed["is_paused"], false);
    }
}
