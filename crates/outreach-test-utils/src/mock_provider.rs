// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock batch-calling provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_core::{
    AdapterType, BatchCallRequest, BatchSubmission, CallProvider, HealthStatus, OutreachError,
    PluginAdapter, ProviderSnapshot,
};

enum Scripted {
    Snapshot(ProviderSnapshot),
    Failure(String),
}

/// A call provider driven by a queue of scripted status responses.
///
/// Each `get_batch_status` pops the next scripted response. Once the queue is
/// empty, the last snapshot served is repeated; with no snapshot ever served
/// the call fails with `ProviderUnavailable`.
pub struct MockCallProvider {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<ProviderSnapshot>>,
    batch_ids: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<BatchCallRequest>>,
    cancelled: Mutex<Vec<String>>,
    retried: Mutex<Vec<String>>,
    status_delay: Mutex<Option<Duration>>,
    status_calls: AtomicUsize,
}

impl MockCallProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            batch_ids: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            retried: Mutex::new(Vec::new()),
            status_delay: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Queues the batch ids handed out by `start_batch_call` and
    /// `retry_batch`, in order.
    pub async fn with_batch_ids(self, ids: &[&str]) -> Self {
        self.batch_ids
            .lock()
            .await
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub async fn push_snapshot(&self, snapshot: ProviderSnapshot) {
        self.script.lock().await.push_back(Scripted::Snapshot(snapshot));
    }

    /// The next status fetch fails with `ProviderUnavailable`.
    pub async fn push_failure(&self, message: &str) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Failure(message.to_string()));
    }

    /// Every status fetch sleeps this long before answering.
    pub async fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().await = Some(delay);
    }

    pub async fn submitted(&self) -> Vec<BatchCallRequest> {
        self.submitted.lock().await.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().await.clone()
    }

    pub async fn retried(&self) -> Vec<String> {
        self.retried.lock().await.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn next_batch_id(&self) -> String {
        self.batch_ids
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| format!("batch_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl Default for MockCallProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockCallProvider {
    fn name(&self) -> &str {
        "mock-call-provider"
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
        Ok(())
    }
}

#[async_trait]
impl CallProvider for MockCallProvider {
    async fn start_batch_call(
        &self,
        request: &BatchCallRequest,
    ) -> Result<BatchSubmission, OutreachError> {
        self.submitted.lock().await.push(request.clone());
        Ok(BatchSubmission {
            batch_id: self.next_batch_id().await,
            recipients_count: request.recipients.len() as u32,
        })
    }

    async fn get_batch_status(&self, batch_id: &str) -> Result<ProviderSnapshot, OutreachError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Snapshot(snapshot)) => {
                *self.last.lock().await = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Scripted::Failure(message)) => Err(OutreachError::ProviderUnavailable {
                message,
                source: None,
            }),
            None => self.last.lock().await.clone().ok_or_else(|| {
                OutreachError::ProviderUnavailable {
                    message: format!("no status scripted for {batch_id}"),
                    source: None,
                }
            }),
        }
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<(), OutreachError> {
        self.cancelled.lock().await.push(batch_id.to_string());
        Ok(())
    }

    async fn retry_batch(&self, batch_id: &str) -> Result<BatchSubmission, OutreachError> {
        self.retried.lock().await.push(batch_id.to_string());
        let recipients_count = self
            .last
            .lock()
            .await
            .as_ref()
            .map_or(0, |snapshot| snapshot.recipients.len() as u32);
        Ok(BatchSubmission {
            batch_id: self.next_batch_id().await,
            recipients_count,
        })
    }
}
