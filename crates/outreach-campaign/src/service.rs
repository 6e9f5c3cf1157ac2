// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-call orchestration: provider submission, lifecycle tracking and
//! monitor supervision behind one per-group lock.

use std::sync::Arc;

use chrono::Utc;
use outreach_core::{
    BatchCallRecord, BatchCallRequest, BatchStats, BatchStatus, CallProvider, KeyedMutex,
    OutreachError,
};
use serde::Serialize;
use tracing::info;

use crate::monitor::{MonitorHandle, ProgressMonitor};
use crate::tracker::BatchTracker;

/// One row of the batch listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub group_id: String,
    pub batch_id: String,
    pub stats: BatchStats,
}

pub struct CampaignService {
    tracker: Arc<BatchTracker>,
    monitor: Arc<ProgressMonitor>,
    provider: Arc<dyn CallProvider>,
    locks: KeyedMutex,
}

impl CampaignService {
    pub fn new(
        tracker: Arc<BatchTracker>,
        monitor: Arc<ProgressMonitor>,
        provider: Arc<dyn CallProvider>,
    ) -> Self {
        Self {
            tracker,
            monitor,
            provider,
            locks: KeyedMutex::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<BatchTracker> {
        &self.tracker
    }

    pub fn monitor(&self) -> &Arc<ProgressMonitor> {
        &self.monitor
    }

    /// Submits a batch to the provider and starts tracking it.
    ///
    /// The in-progress check runs before the provider is contacted, so a
    /// rejected start places no calls.
    pub async fn start(
        &self,
        request: BatchCallRequest,
        metadata: serde_json::Value,
    ) -> Result<BatchCallRecord, OutreachError> {
        if request.group_id.trim().is_empty() {
            return Err(OutreachError::InvalidInput("group_id must not be empty".into()));
        }
        if request.recipients.is_empty() {
            return Err(OutreachError::InvalidInput(
                "a batch needs at least one recipient".into(),
            ));
        }

        let group_id = request.group_id.clone();
        let _guard = self.locks.lock(&group_id).await;
        self.ensure_not_running(&group_id).await?;

        let submission = self.provider.start_batch_call(&request).await?;
        let total = submission.recipients_count.max(request.recipients.len() as u32);
        let record = self
            .tracker
            .start_batch(&group_id, &submission.batch_id, total, metadata)
            .await?;
        self.monitor.spawn(&group_id, &record.batch_id);
        info!(group_id = %group_id, batch_id = %record.batch_id, call_name = %request.call_name, "batch submitted");
        Ok(record)
    }

    /// Cancels the group's running batch at the provider and locally.
    /// A batch that already finished is returned unchanged.
    pub async fn cancel(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        let _guard = self.locks.lock(group_id).await;
        let record = self.require_started(group_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        self.provider.cancel_batch(&record.batch_id).await?;
        self.monitor.stop(group_id);
        self.tracker.cancel(group_id).await
    }

    /// Re-runs a finished batch as a new lifecycle instance.
    pub async fn retry(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        let _guard = self.locks.lock(group_id).await;
        let previous = self.require_started(group_id).await?;
        if previous.status == BatchStatus::InProgress {
            return Err(OutreachError::AlreadyInProgress {
                group_id: group_id.to_string(),
            });
        }

        let submission = self.provider.retry_batch(&previous.batch_id).await?;
        let total = submission.recipients_count.max(previous.total_recipients);
        let metadata = serde_json::json!({
            "retry_of": previous.batch_id,
            "previous": previous.metadata,
        });
        let record = self
            .tracker
            .start_batch(group_id, &submission.batch_id, total, metadata)
            .await?;
        self.monitor.spawn(group_id, &record.batch_id);
        info!(group_id, batch_id = %record.batch_id, retry_of = %previous.batch_id, "batch retried");
        Ok(record)
    }

    /// Polls the provider once for the group's current batch.
    pub async fn refresh(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        let record = self.require_started(group_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        self.monitor.poll_once(group_id, &record.batch_id).await
    }

    pub async fn stats(&self, group_id: &str) -> Result<BatchStats, OutreachError> {
        self.tracker.get_stats(group_id).await
    }

    pub async fn list(&self) -> Result<Vec<BatchSummary>, OutreachError> {
        Ok(self
            .tracker
            .list_batches()
            .await?
            .iter()
            .map(|record| BatchSummary {
                group_id: record.group_id.clone(),
                batch_id: record.batch_id.clone(),
                stats: self.tracker.stats_for(record),
            })
            .collect())
    }

    /// Restarts monitors for batches left `in_progress` by a previous run.
    ///
    /// A resumed monitor keeps the ceiling of its batch's original start.
    /// Stale batches are left alone; they surface through `stale` stats.
    pub async fn resume_monitors(&self) -> Result<Vec<MonitorHandle>, OutreachError> {
        let mut handles = Vec::new();
        for record in self.tracker.list_batches().await? {
            if record.status != BatchStatus::InProgress || self.tracker.stats_for(&record).stale {
                continue;
            }
            let started_at = record.started_at.unwrap_or_else(Utc::now);
            handles.push(self.monitor.resume(&record.group_id, &record.batch_id, started_at));
        }
        if !handles.is_empty() {
            info!(count = handles.len(), "resumed batch monitors");
        }
        Ok(handles)
    }

    /// Stops every monitor and waits for pending follow-ups.
    pub async fn shutdown(&self) {
        self.monitor.drain().await;
    }

    async fn ensure_not_running(&self, group_id: &str) -> Result<(), OutreachError> {
        match self.tracker.get_record(group_id).await? {
            Some(record) if record.status == BatchStatus::InProgress => {
                Err(OutreachError::AlreadyInProgress {
                    group_id: group_id.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn require_started(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        match self.tracker.get_record(group_id).await? {
            Some(record) if record.status != BatchStatus::None => Ok(record),
            _ => Err(OutreachError::NoBatchStarted {
                group_id: group_id.to_string(),
            }),
        }
    }
}
