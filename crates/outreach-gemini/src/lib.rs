// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini reply generator for Outreach.
//!
//! [`GeminiClient`] implements [`ReplyGenerator`] with a single
//! non-streaming `generateContent` call per reply.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use outreach_config::model::GeminiConfig;
use outreach_core::{
    AdapterType, HealthStatus, HistoryTurn, OutreachError, PluginAdapter, ReplyGenerator,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::types::{build_request, ApiErrorResponse, GenerateResponse};

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl GeminiClient {
    /// Builds the client from `[gemini]` config.
    ///
    /// The API key comes from `gemini.api_key`, falling back to the
    /// `GEMINI_API_KEY` environment variable.
    pub fn new(config: &GeminiConfig) -> Result<Self, OutreachError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key).map_err(|e| {
                OutreachError::Config(format!("invalid Gemini API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| OutreachError::GenerationFailed {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = %config.model, "Gemini generator initialized");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_retries: 1,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl PluginAdapter for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, OutreachError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OutreachError> {
        debug!("Gemini generator shutting down");
        Ok(())
    }
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    /// On transient errors (429, 500, 503), retries once after a 1-second delay.
    async fn generate_reply(
        &self,
        system_instruction: &str,
        history: &[HistoryTurn],
        message: &str,
    ) -> Result<String, OutreachError> {
        let request = build_request(system_instruction, history, message);
        let url = self.endpoint();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying generation after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| OutreachError::GenerationFailed {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
            let status = response.status();
            debug!(status = %status, attempt, model = %self.model, "generation response received");

            if status.is_success() {
                let body: GenerateResponse =
                    response
                        .json()
                        .await
                        .map_err(|e| OutreachError::GenerationFailed {
                            message: format!("failed to parse Gemini response: {e}"),
                            source: Some(Box::new(e)),
                        })?;
                return body.text().ok_or_else(|| {
                    let reason = body
                        .prompt_feedback
                        .as_ref()
                        .and_then(|f| f.block_reason.clone())
                        .or_else(|| body.candidates.first().and_then(|c| c.finish_reason.clone()))
                        .unwrap_or_else(|| "no candidates".into());
                    OutreachError::GenerationFailed {
                        message: format!("Gemini returned no text ({reason})"),
                        source: None,
                    }
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "Gemini API error ({}): {}",
                    api_err.error.status, api_err.error.message
                ),
                Err(_) => format!("Gemini API returned {status}: {body}"),
            };
            let err = OutreachError::GenerationFailed {
                message,
                source: None,
            };
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| OutreachError::GenerationFailed {
            message: "generation failed after retries".into(),
            source: None,
        }))
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, OutreachError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        OutreachError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}
