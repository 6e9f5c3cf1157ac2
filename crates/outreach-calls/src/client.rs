// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the batch-calling REST API.
//!
//! Status reads are retried once on transient errors. Submissions, cancels
//! and retries are sent exactly once: repeating them could place calls twice.

use std::time::Duration;

use outreach_core::OutreachError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::ApiErrorResponse;

const BATCH_CALLING_PATH: &str = "/v1/convai/batch-calling";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, OutreachError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "xi-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                OutreachError::Config(format!("invalid calls API key header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OutreachError::ProviderUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// `{base}/v1/convai/batch-calling{suffix}`
    pub fn batch_url(&self, suffix: &str) -> String {
        format!("{}{BATCH_CALLING_PATH}{suffix}", self.base_url)
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, OutreachError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying status request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(request_failed)?;
            let status = response.status();
            debug!(status = %status, attempt, "status response received");

            if status.is_success() {
                return parse_body(response).await;
            }
            let body = response.text().await.unwrap_or_default();
            let err = api_error(status, &body);
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| OutreachError::ProviderUnavailable {
            message: "status request failed after retries".into(),
            source: None,
        }))
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, OutreachError> {
        let mut request = self.client.request(Method::POST, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(request_failed)?;
        let status = response.status();
        debug!(status = %status, url, "post response received");

        if status.is_success() {
            return parse_body(response).await;
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }
}

async fn parse_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, OutreachError> {
    let body = response
        .text()
        .await
        .map_err(|e| OutreachError::ProviderUnavailable {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
    // Some endpoints acknowledge with an empty body.
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|e| OutreachError::ProviderUnavailable {
        message: format!("failed to parse provider response: {e}"),
        source: Some(Box::new(e)),
    })
}

fn request_failed(e: reqwest::Error) -> OutreachError {
    OutreachError::ProviderUnavailable {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

fn api_error(status: reqwest::StatusCode, body: &str) -> OutreachError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!("calls API error ({status}): {}", api_err.detail),
        Err(_) => format!("calls API returned {status}: {body}"),
    };
    OutreachError::ProviderUnavailable {
        message,
        source: None,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_url_trims_trailing_slash() {
        let client = ApiClient::new("key", "https://api.example.com/").unwrap();
        assert_eq!(
            client.batch_url("/batch_1/cancel"),
            "https://api.example.com/v1/convai/batch-calling/batch_1/cancel"
        );
    }

    #[test]
    fn invalid_key_is_config_error() {
        let err = ApiClient::new("bad\nkey", "https://api.example.com").unwrap_err();
        assert!(matches!(err, OutreachError::Config(_)));
    }

    #[test]
    fn api_error_prefers_structured_detail() {
        let err = api_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":{"status":"invalid_agent","message":"no such agent"}}"#,
        );
        assert!(err.to_string().contains("invalid_agent: no such agent"));
        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }
}
