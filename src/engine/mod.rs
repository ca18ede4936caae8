use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::batch::{FeatureFlags, OutboundRequest};
use crate::models::CallbackPayload;

/// Configuration for the transcription engine client
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API key (from DEEPGRAM_API_KEY env var)
    pub api_key: String,
    /// Listen endpoint; overridable for testing against a stub
    pub base_url: String,
    /// Ceiling on any single request to the engine
    pub timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.deepgram.com/v1/listen";

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DEEPGRAM_API_KEY")
            .context("DEEPGRAM_API_KEY environment variable not set")?;
        let base_url = std::env::var("DEEPGRAM_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url,
            timeout: Duration::from_secs(120),
        })
    }
}

/// Receipt for an accepted asynchronous submission
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReceipt {
    pub request_id: String,
}

/// Transcription engine HTTP client
pub struct EngineClient {
    client: Client,
    config: EngineConfig,
}

impl EngineClient {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Submit one planned request for asynchronous transcription. The engine
    /// answers immediately with a request id and POSTs results to the
    /// request's callback URL when done.
    pub async fn submit(&self, request: &OutboundRequest) -> Result<SubmitReceipt> {
        let response = self
            .client
            .post(&self.config.base_url)
            .query(&request.query_params())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .json(&json!({ "url": request.audio_url }))
            .timeout(self.config.timeout)
            .send()
            .await
            .context("Failed to send submission to transcription engine")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Engine rejected submission: {} - {}", status, body);
        }

        let receipt: SubmitReceipt = response
            .json()
            .await
            .context("Failed to parse engine submission receipt")?;
        info!("Submission accepted with request_id {}", receipt.request_id);
        Ok(receipt)
    }

    /// Transcribe a URL synchronously (no callback). Used by the audit paths,
    /// which need a hypothesis transcript right away.
    pub async fn transcribe_url(
        &self,
        audio_url: &str,
        features: &FeatureFlags,
    ) -> Result<CallbackPayload> {
        let response = self
            .client
            .post(&self.config.base_url)
            .query(&features.query_params())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .json(&json!({ "url": audio_url }))
            .timeout(self.config.timeout)
            .send()
            .await
            .context("Failed to send transcription request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Engine transcription error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse engine transcription response")
    }

    /// Transcribe a local audio file synchronously by uploading its bytes
    pub async fn transcribe_file(
        &self,
        path: &Path,
        features: &FeatureFlags,
    ) -> Result<CallbackPayload> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read audio file: {path:?}"))?;

        let response = self
            .client
            .post(&self.config.base_url)
            .query(&features.query_params())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .timeout(self.config.timeout)
            .send()
            .await
            .context("Failed to send file transcription request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Engine file transcription error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse engine transcription response")
    }
}
