// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-calling provider adapter for Outreach.
//!
//! [`BatchCallingClient`] implements [`CallProvider`] over the voice
//! platform's batch-calling REST API: submit a batch, read its status,
//! cancel it and retry it.

pub mod client;
pub mod types;

use async_trait::async_trait;
use outreach_config::model::CallsConfig;
use outreach_core::{
    AdapterType, BatchCallRequest, BatchSubmission, CallProvider, HealthStatus, OutreachError,
    PluginAdapter, ProviderSnapshot,
};
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::types::{BatchResponse, SubmitRecipient, SubmitRequest};

pub struct BatchCallingClient {
    api: ApiClient,
    agent_id: String,
    default_phone_number_id: Option<String>,
}

impl BatchCallingClient {
    /// Builds the client from `[calls]` config.
    ///
    /// # API Key Resolution
    /// 1. `calls.api_key` if set
    /// 2. `ELEVENLABS_API_KEY` environment variable
    /// 3. Returns error if neither is available
    pub fn new(config: &CallsConfig) -> Result<Self, OutreachError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let agent_id = config
            .agent_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| OutreachError::Config("calls.agent_id is required".into()))?;
        let api = ApiClient::new(&api_key, &config.base_url)?;
        info!(base_url = %config.base_url, "batch calling client initialized");
        Ok(Self {
            api,
            agent_id,
            default_phone_number_id: config.agent_phone_number_id.clone(),
        })
    }

    fn submit_request(&self, request: &BatchCallRequest) -> Result<SubmitRequest, OutreachError> {
        let phone_number_id = Some(request.agent_phone_id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_phone_number_id.clone())
            .ok_or_else(|| {
                OutreachError::InvalidInput(
                    "agent_phone_id is required when calls.agent_phone_number_id is unset".into(),
                )
            })?;

        Ok(SubmitRequest {
            call_name: request.call_name.clone(),
            agent_id: self.agent_id.clone(),
            agent_phone_number_id: phone_number_id,
            scheduled_time_unix: request.scheduled_time.map(|t| t.timestamp()),
            recipients: request
                .recipients
                .iter()
                .map(|recipient| SubmitRecipient {
                    phone_number: recipient.contact_id.clone(),
                })
                .collect(),
        })
    }
}

#[async_trait]
impl PluginAdapter for BatchCallingClient {
    fn name(&self) -> &str {
        "batch-calling"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CallProvider
    }

    async fn health_check(&self) -> Result<HealthStatus, OutreachError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OutreachError> {
        debug!("batch calling client shutting down");
        Ok(())
    }
}

#[async_trait]
impl CallProvider for BatchCallingClient {
    async fn start_batch_call(
        &self,
        request: &BatchCallRequest,
    ) -> Result<BatchSubmission, OutreachError> {
        let body = self.submit_request(request)?;
        let response: BatchResponse = self
            .api
            .post(&self.api.batch_url("/submit"), Some(&body))
            .await?;
        info!(
            group_id = %request.group_id,
            batch_id = %response.id,
            recipients = body.recipients.len(),
            "batch call submitted"
        );
        Ok(BatchSubmission {
            recipients_count: response
                .total_calls_scheduled
                .unwrap_or(body.recipients.len() as u32),
            batch_id: response.id,
        })
    }

    async fn get_batch_status(&self, batch_id: &str) -> Result<ProviderSnapshot, OutreachError> {
        let response: BatchResponse = self
            .api
            .get(&self.api.batch_url(&format!("/{batch_id}")))
            .await?;
        response.into_snapshot()
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<(), OutreachError> {
        let _: serde_json::Value = self
            .api
            .post::<(), _>(&self.api.batch_url(&format!("/{batch_id}/cancel")), None)
            .await?;
        info!(batch_id, "batch call cancelled at provider");
        Ok(())
    }

    async fn retry_batch(&self, batch_id: &str) -> Result<BatchSubmission, OutreachError> {
        let response: BatchResponse = self
            .api
            .post::<(), _>(&self.api.batch_url(&format!("/{batch_id}/retry")), None)
            .await?;
        info!(batch_id, new_batch_id = %response.id, "batch call retried at provider");
        Ok(BatchSubmission {
            recipients_count: response
                .total_calls_scheduled
                .unwrap_or(response.recipients.len() as u32),
            batch_id: response.id,
        })
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, OutreachError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("ELEVENLABS_API_KEY").map_err(|_| {
        OutreachError::Config(
            "calls API key not found. Set calls.api_key in config or ELEVENLABS_API_KEY environment variable.".into(),
        )
    })
}
