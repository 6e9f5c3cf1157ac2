// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock reply generator for deterministic testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_core::{
    AdapterType, HealthStatus, HistoryTurn, OutreachError, PluginAdapter, ReplyGenerator,
};

/// One recorded `generate_reply` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateCall {
    pub system_instruction: String,
    pub history: Vec<HistoryTurn>,
    pub message: String,
}

/// A generator that returns queued replies.
///
/// Replies are popped from a FIFO queue. When the queue is empty, a default
/// "mock reply" text is returned. `None` entries fail the call.
pub struct MockGenerator {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<GenerateCall>>,
    delay: Mutex<Option<Duration>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Some).collect()),
            ..Self::new()
        }
    }

    pub async fn add_reply(&self, text: &str) {
        self.replies.lock().await.push_back(Some(text.to_string()));
    }

    /// The next call fails with `GenerationFailed`.
    pub async fn fail_next(&self) {
        self.replies.lock().await.push_back(None);
    }

    /// Every call sleeps this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
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
        Ok(())
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate_reply(
        &self,
        system_instruction: &str,
        history: &[HistoryTurn],
        message: &str,
    ) -> Result<String, OutreachError> {
        self.calls.lock().await.push(GenerateCall {
            system_instruction: system_instruction.to_string(),
            history: history.to_vec(),
            message: message.to_string(),
        });

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.replies.lock().await.pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(OutreachError::GenerationFailed {
                message: "mock failure".into(),
                source: None,
            }),
            None => Ok("mock reply".into()),
        }
    }
}
