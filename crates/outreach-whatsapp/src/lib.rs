// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel for Outreach.
//!
//! [`WhatsAppCloudTransport`] sends text messages through the Graph API.
//! [`webhook`] parses inbound deliveries and answers the subscription
//! handshake; [`signature`] verifies `X-Hub-Signature-256`.

pub mod signature;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use outreach_config::model::WhatsAppConfig;
use outreach_core::{AdapterType, HealthStatus, MessageTransport, OutreachError, PluginAdapter};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use signature::{SIGNATURE_HEADER, verify_signature};
pub use webhook::{InboundText, WebhookPayload, verify_subscription};

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: String,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    preview_url: bool,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphErrorResponse {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

pub struct WhatsAppCloudTransport {
    client: reqwest::Client,
    messages_url: String,
    phone_number_id: String,
}

impl WhatsAppCloudTransport {
    /// Builds the transport from `[whatsapp]` config.
    ///
    /// The access token falls back to `WHATSAPP_ACCESS_TOKEN`. A phone
    /// number id is required.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, OutreachError> {
        let token = resolve_access_token(&config.access_token)?;
        let phone_number_id = config
            .phone_number_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| OutreachError::Config("whatsapp.phone_number_id is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                OutreachError::Config(format!("invalid whatsapp access token header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OutreachError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let messages_url = format!(
            "{}/{}/{}/messages",
            config.base_url.trim_end_matches('/'),
            config.api_version,
            phone_number_id
        );
        info!(phone_number_id = %phone_number_id, "whatsapp transport initialized");

        Ok(Self {
            client,
            messages_url,
            phone_number_id,
        })
    }

    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppCloudTransport {
    fn name(&self) -> &str {
        "whatsapp-cloud"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, OutreachError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OutreachError> {
        debug!("whatsapp transport shutting down");
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for WhatsAppCloudTransport {
    async fn send(&self, contact_id: &str, text: &str) -> Result<String, OutreachError> {
        let to = webhook::wa_id_from_contact(contact_id);
        if to.is_empty() {
            return Err(OutreachError::InvalidInput(format!(
                "contact `{contact_id}` has no phone digits"
            )));
        }
        let body = SendTextRequest {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: TextPayload {
                preview_url: false,
                body: text,
            },
        };

        let response = self
            .client
            .post(&self.messages_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OutreachError::Transport {
                message: format!("whatsapp request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let status = response.status();
        let raw = response.text().await.map_err(|e| OutreachError::Transport {
            message: format!("failed to read whatsapp response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GraphErrorResponse>(&raw)
                .map(|e| match e.error.code {
                    Some(code) => format!("{} (code {code})", e.error.message),
                    None => e.error.message,
                })
                .unwrap_or(raw);
            warn!(status = %status, contact_id, "whatsapp send rejected");
            return Err(OutreachError::Transport {
                message: format!("whatsapp API error ({status}): {detail}"),
                source: None,
            });
        }

        let parsed: SendResponse =
            serde_json::from_str(&raw).map_err(|e| OutreachError::Transport {
                message: format!("failed to parse whatsapp response: {e}"),
                source: Some(Box::new(e)),
            })?;
        let id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| OutreachError::Transport {
                message: "whatsapp response carried no message id".into(),
                source: None,
            })?;
        debug!(contact_id, message_id = %id, "whatsapp message accepted");
        Ok(id)
    }
}

fn resolve_access_token(config_token: &Option<String>) -> Result<String, OutreachError> {
    if let Some(token) = config_token
        && !token.is_empty()
    {
        return Ok(token.clone());
    }

    std::env::var("WHATSAPP_ACCESS_TOKEN").map_err(|_| {
        OutreachError::Config(
            "whatsapp access token not found. Set whatsapp.access_token in config or WHATSAPP_ACCESS_TOKEN environment variable.".into(),
        )
    })
}
