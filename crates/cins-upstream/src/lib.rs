//! Upstream campaign source contract: config, source registry, and the
//! HTTP implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "cins-upstream";

/// One upstream exchange, successful or not. Non-2xx statuses are data,
/// not errors: the caller needs the status and body to build its
/// diagnostic envelope.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub final_url: String,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.body))
    }

    /// Lossy UTF-8 body prefix for error messages and diagnostics.
    pub fn body_preview(&self, limit: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let mut preview: String = text.chars().take(limit).collect();
        if text.chars().count() > limit {
            preview.push('…');
        }
        preview
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The one suspension point of a batch: a single GET per invocation, no
/// retries, no per-record fetching.
#[async_trait]
pub trait CampaignSource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn fetch_campaigns(&self, request_id: Uuid) -> Result<UpstreamResponse, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub registry_path: PathBuf,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CINS_UPSTREAM_URL")
                .unwrap_or_else(|_| "http://localhost:8001/api/campaigns".to_string()),
            user_agent: std::env::var("CINS_USER_AGENT")
                .unwrap_or_else(|_| "cins-bot/0.1".to_string()),
            timeout_secs: std::env::var("CINS_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            registry_path: std::env::var("CINS_SOURCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./sources.yaml")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    pub base_url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SourceRegistry {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn first_enabled(&self) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.enabled)
    }
}

/// Registry-first source resolution: the first enabled `sources.yaml` entry
/// wins, the env-configured base URL is the fallback.
fn resolve_source(config: &UpstreamConfig) -> (String, String) {
    SourceRegistry::load(&config.registry_path)
        .ok()
        .as_ref()
        .and_then(SourceRegistry::first_enabled)
        .map(|s| (s.source_id.clone(), s.base_url.clone()))
        .unwrap_or_else(|| ("primary".to_string(), config.base_url.clone()))
}

#[derive(Debug)]
pub struct HttpCampaignSource {
    client: reqwest::Client,
    source_id: String,
    url: String,
}

impl HttpCampaignSource {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let (source_id, url) = resolve_source(config);
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            client,
            source_id,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CampaignSource for HttpCampaignSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch_campaigns(&self, request_id: Uuid) -> Result<UpstreamResponse, UpstreamError> {
        let span = info_span!("campaign_fetch", %request_id, source_id = %self.source_id, url = %self.url);

        async {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(|source| UpstreamError::Request {
                    url: self.url.clone(),
                    source,
                })?;

            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            let body = response
                .bytes()
                .await
                .map_err(|source| UpstreamError::Request {
                    url: final_url.clone(),
                    source,
                })?
                .to_vec();

            Ok(UpstreamResponse {
                status,
                content_type,
                final_url,
                body,
                fetched_at: Utc::now(),
            })
        }
        .instrument(span)
        .await
    }
}
