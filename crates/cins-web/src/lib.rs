//! Axum JSON API for CINS: the campaigns proxy endpoint and its response
//! envelope.
//!
//! The envelope contract is deliberate: `success` is `true` even when the
//! upstream call fails. Degradation is signaled through the `error` string
//! and an empty `data` array, never through a non-2xx status from this
//! layer.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use cins_core::CanonicalCampaign;
use cins_normalize::normalize_batch;
use cins_upstream::{CampaignSource, HttpCampaignSource, UpstreamConfig, UpstreamResponse};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::warn;
use uuid::Uuid;

pub const CRATE_NAME: &str = "cins-web";

const BODY_PREVIEW_LIMIT: usize = 200;

/// Shared handler state. The upstream handle is passed in explicitly —
/// there is no process-wide lazily initialized connection.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn CampaignSource>,
}

impl AppState {
    pub fn new(source: Arc<dyn CampaignSource>) -> Self {
        Self { source }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignEnvelope {
    pub success: bool,
    pub data: Vec<CanonicalCampaign>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "originalResponse", skip_serializing_if = "Option::is_none")]
    pub original_response: Option<UpstreamDiagnostics>,
}

impl CampaignEnvelope {
    fn ok(data: Vec<CanonicalCampaign>, diagnostics: UpstreamDiagnostics) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
            error: None,
            original_response: Some(diagnostics),
        }
    }

    fn degraded(error: String, diagnostics: UpstreamDiagnostics) -> Self {
        Self {
            success: true,
            data: Vec::new(),
            count: 0,
            error: Some(error),
            original_response: Some(diagnostics),
        }
    }
}

/// Diagnostic metadata about the upstream exchange, attached to every
/// envelope for debugging the proxy without re-fetching.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamDiagnostics {
    pub request_id: Uuid,
    pub source_id: String,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub final_url: Option<String>,
    pub body_bytes: usize,
    pub body_sha256: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl UpstreamDiagnostics {
    fn for_response(source_id: &str, request_id: Uuid, response: &UpstreamResponse) -> Self {
        Self {
            request_id,
            source_id: source_id.to_string(),
            status: Some(response.status),
            content_type: response.content_type.clone(),
            final_url: Some(response.final_url.clone()),
            body_bytes: response.body.len(),
            body_sha256: Some(response.body_sha256()),
            fetched_at: Some(response.fetched_at),
        }
    }

    fn for_transport_failure(source_id: &str, request_id: Uuid) -> Self {
        Self {
            request_id,
            source_id: source_id.to_string(),
            status: None,
            content_type: None,
            final_url: None,
            body_bytes: 0,
            body_sha256: None,
            fetched_at: None,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/campaigns", get(campaigns_handler))
        .route("/health", get(health_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("CINS_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let config = UpstreamConfig::from_env();
    let source = HttpCampaignSource::new(&config)?;
    let state = AppState::new(Arc::new(source));
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn campaigns_handler(State(state): State<Arc<AppState>>) -> Json<CampaignEnvelope> {
    let request_id = Uuid::new_v4();
    Json(build_campaign_envelope(state.source.as_ref(), request_id).await)
}

/// Fetch, normalize, and wrap one batch. No failure mode escapes: every
/// outcome is a well-formed envelope.
pub async fn build_campaign_envelope(
    source: &dyn CampaignSource,
    request_id: Uuid,
) -> CampaignEnvelope {
    let response = match source.fetch_campaigns(request_id).await {
        Ok(response) => response,
        Err(err) => {
            warn!(%request_id, error = %err, "upstream request failed");
            return CampaignEnvelope::degraded(
                format!("External API request failed: {err}"),
                UpstreamDiagnostics::for_transport_failure(source.source_id(), request_id),
            );
        }
    };

    let diagnostics = UpstreamDiagnostics::for_response(source.source_id(), request_id, &response);

    if !response.is_success() {
        warn!(%request_id, status = response.status, "upstream returned non-success status");
        return CampaignEnvelope::degraded(
            format!(
                "External API returned {}: {}",
                response.status,
                response.body_preview(BODY_PREVIEW_LIMIT)
            ),
            diagnostics,
        );
    }

    let payload: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(err) => {
            warn!(%request_id, error = %err, "upstream body is not valid JSON");
            return CampaignEnvelope::degraded(
                format!("External API returned a non-JSON body: {err}"),
                diagnostics,
            );
        }
    };

    CampaignEnvelope::ok(normalize_batch(payload), diagnostics)
}
