//! HTTP client for the external summarization service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use paperhub_core::config::ai::AiConfig;
use paperhub_core::error::AppError;
use paperhub_core::result::AppResult;
use paperhub_service::SummaryRequest;

/// Why a delivery to the AI worker failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Network failure or server error; worth another attempt.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// The worker refused the request; retrying will not help.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// The failure reason without the classification prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(msg) | Self::Permanent(msg) => msg,
        }
    }
}

/// Talks to the AI worker.
#[async_trait]
pub trait AiClient: Send + Sync + std::fmt::Debug {
    /// Hand one request to the worker. Success means accepted, not done.
    async fn summarize(&self, request: &SummaryRequest) -> Result<(), DeliveryError>;

    /// Whether the worker answers its health check.
    async fn health(&self) -> bool;
}

/// Body of `POST /summarize`.
#[derive(Debug, Serialize)]
struct SummarizeBody<'a> {
    file_id: Uuid,
    job_id: Uuid,
    storage_path: &'a str,
    style: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_instructions: Option<&'a str>,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

/// [`AiClient`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpAiClient {
    client: Client,
    base_url: String,
}

impl HttpAiClient {
    /// Build a client from configuration.
    pub fn new(config: &AiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build AI client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn summarize(&self, request: &SummaryRequest) -> Result<(), DeliveryError> {
        let body = SummarizeBody {
            file_id: request.file_id,
            job_id: request.job_id,
            storage_path: &request.storage_path,
            style: request.style.as_str(),
            custom_instructions: request.custom_instructions.as_deref(),
            language: &request.language,
            callback_url: request.callback_url.as_deref(),
        };

        let resp = self
            .client
            .post(self.url("summarize"))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("AI worker unreachable: {e}")))?;

        let status = resp.status();
        debug!(job_id = %request.job_id, status = %status, "AI worker answered");
        classify(status)
    }

    async fn health(&self) -> bool {
        match self.client.get(self.url("health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Map a response status onto the retry policy.
fn classify(status: StatusCode) -> Result<(), DeliveryError> {
    match status {
        StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
        s if s.is_server_error() => Err(DeliveryError::Transient(format!(
            "AI worker returned HTTP {s}"
        ))),
        s => Err(DeliveryError::Permanent(format!(
            "AI worker returned HTTP {s}"
        ))),
    }
}
