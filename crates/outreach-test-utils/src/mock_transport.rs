// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging transport that captures outbound messages.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_core::{
    AdapterType, HealthStatus, MessageTransport, OutreachError, PluginAdapter,
};

/// Captures `(contact_id, text)` for every accepted send and returns a
/// fresh `wamid.mock-*` id.
pub struct MockTransport {
    sent: Mutex<Vec<(String, String)>>,
    rejected: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
        }
    }

    /// Sends to `contact_id` fail with a transport error from now on.
    pub async fn reject(&self, contact_id: &str) {
        self.rejected.lock().await.insert(contact_id.to_string());
    }

    pub async fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
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
        Ok(())
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn send(&self, contact_id: &str, text: &str) -> Result<String, OutreachError> {
        if self.rejected.lock().await.contains(contact_id) {
            return Err(OutreachError::Transport {
                message: format!("recipient {contact_id} rejected"),
                source: None,
            });
        }
        self.sent
            .lock()
            .await
            .push((contact_id.to_string(), text.to_string()));
        Ok(format!("wamid.mock-{}", uuid::Uuid::new_v4()))
    }
}
