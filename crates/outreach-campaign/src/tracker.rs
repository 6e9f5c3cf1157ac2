// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch lifecycle state machine.
//!
//! `none -> in_progress -> {completed | failed | cancelled}`. Terminal records
//! never move again until a new lifecycle instance is started for the group.
//! Every operation on one group runs under that group's lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use outreach_bus::{BusEvent, EventBus};
use outreach_core::types::success_rate;
use outreach_core::{
    BatchCallRecord, BatchStats, BatchStatus, CallStatus, KeyedMutex, OutreachError,
    ProviderSnapshot, StorageAdapter,
};
use tracing::{debug, info, warn};

/// Per-group batch lifecycle tracker.
pub struct BatchTracker {
    storage: Arc<dyn StorageAdapter>,
    bus: Arc<EventBus>,
    locks: KeyedMutex,
    stale_after: chrono::Duration,
}

impl BatchTracker {
    /// `stale_after` is the polling ceiling: an `in_progress` batch older
    /// than this is reported as stale.
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        bus: Arc<EventBus>,
        stale_after: Duration,
    ) -> Self {
        Self {
            storage,
            bus,
            locks: KeyedMutex::new(),
            stale_after: chrono::Duration::from_std(stale_after)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Begins a new lifecycle instance for the group.
    ///
    /// Fails with `AlreadyInProgress`, leaving the record untouched, when the
    /// group's current batch has not finished.
    pub async fn start_batch(
        &self,
        group_id: &str,
        batch_id: &str,
        total_recipients: u32,
        metadata: serde_json::Value,
    ) -> Result<BatchCallRecord, OutreachError> {
        let _guard = self.locks.lock(group_id).await;

        let current = self.storage.get_batch(group_id).await?;
        if current.is_some_and(|record| record.status == BatchStatus::InProgress) {
            return Err(OutreachError::AlreadyInProgress {
                group_id: group_id.to_string(),
            });
        }

        let now = Utc::now();
        let record = BatchCallRecord {
            group_id: group_id.to_string(),
            batch_id: batch_id.to_string(),
            status: BatchStatus::InProgress,
            started_at: Some(now),
            completed_at: None,
            total_recipients,
            completed_count: 0,
            failed_count: 0,
            raw_provider_snapshot: None,
            metadata,
            updated_at: now,
        };
        self.storage.save_batch(&record).await?;
        info!(group_id, batch_id, total_recipients, "batch started");
        self.publish(&record);
        Ok(record)
    }

    /// Folds a provider snapshot into the group's record.
    ///
    /// Terminal records and snapshots for a different lifecycle instance are
    /// returned unchanged.
    pub async fn reconcile(
        &self,
        group_id: &str,
        snapshot: &ProviderSnapshot,
    ) -> Result<BatchCallRecord, OutreachError> {
        let _guard = self.locks.lock(group_id).await;

        let mut record = self.current(group_id).await?;
        if record.status.is_terminal() {
            debug!(group_id, status = %record.status, "reconcile on terminal batch ignored");
            return Ok(record);
        }
        if record.batch_id != snapshot.batch_id {
            warn!(
                group_id,
                current = %record.batch_id,
                reported = %snapshot.batch_id,
                "snapshot belongs to a different batch, ignored"
            );
            return Ok(record);
        }

        let (completed, failed) = tally(snapshot, record.total_recipients);
        record.completed_count = completed;
        record.failed_count = failed;
        record.raw_provider_snapshot = Some(snapshot.clone());
        let now = Utc::now();
        record.updated_at = now;

        if let Some(terminal) = snapshot.status.as_terminal() {
            record.status = terminal;
            if record.completed_at.is_none() {
                record.completed_at = Some(now);
            }
            info!(
                group_id,
                batch_id = %record.batch_id,
                status = %terminal,
                completed,
                failed,
                "batch finished"
            );
        } else {
            debug!(group_id, batch_id = %record.batch_id, completed, failed, "batch reconciled");
        }

        self.storage.save_batch(&record).await?;
        self.publish(&record);
        Ok(record)
    }

    /// Marks an `in_progress` batch cancelled. Terminal records are returned
    /// unchanged.
    pub async fn cancel(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        let _guard = self.locks.lock(group_id).await;

        let mut record = self.current(group_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        let now = Utc::now();
        record.status = BatchStatus::Cancelled;
        record.completed_at = Some(now);
        record.updated_at = now;
        self.storage.save_batch(&record).await?;
        info!(group_id, batch_id = %record.batch_id, "batch cancelled");
        self.publish(&record);
        Ok(record)
    }

    /// Statistics for the group's current batch, or zeroed statistics when
    /// the group has never been called.
    pub async fn get_stats(&self, group_id: &str) -> Result<BatchStats, OutreachError> {
        Ok(match self.storage.get_batch(group_id).await? {
            Some(record) => self.stats_for(&record),
            None => BatchStats::never_called(),
        })
    }

    /// The group's current record, if any.
    pub async fn get_record(&self, group_id: &str) -> Result<Option<BatchCallRecord>, OutreachError> {
        self.storage.get_batch(group_id).await
    }

    /// Every group's current record.
    pub async fn list_batches(&self) -> Result<Vec<BatchCallRecord>, OutreachError> {
        self.storage.list_batches().await
    }

    /// Batches still `in_progress` past the polling ceiling.
    pub async fn list_stale(&self) -> Result<Vec<BatchCallRecord>, OutreachError> {
        let now = Utc::now();
        Ok(self
            .storage
            .list_batches()
            .await?
            .into_iter()
            .filter(|record| self.is_stale_at(record, now))
            .collect())
    }

    pub fn stats_for(&self, record: &BatchCallRecord) -> BatchStats {
        BatchStats {
            has_been_called: record.status != BatchStatus::None,
            status: record.status,
            total_recipients: record.total_recipients,
            completed_count: record.completed_count,
            failed_count: record.failed_count,
            success_rate: success_rate(record.completed_count, record.total_recipients),
            started_at: record.started_at,
            completed_at: record.completed_at,
            stale: self.is_stale_at(record, Utc::now()),
        }
    }

    fn is_stale_at(&self, record: &BatchCallRecord, now: DateTime<Utc>) -> bool {
        record.status == BatchStatus::InProgress
            && record
                .started_at
                .is_some_and(|started| now.signed_duration_since(started) > self.stale_after)
    }

    async fn current(&self, group_id: &str) -> Result<BatchCallRecord, OutreachError> {
        match self.storage.get_batch(group_id).await? {
            Some(record) if record.status != BatchStatus::None => Ok(record),
            _ => Err(OutreachError::NoBatchStarted {
                group_id: group_id.to_string(),
            }),
        }
    }

    fn publish(&self, record: &BatchCallRecord) {
        self.bus.publish(BusEvent::BatchUpdate {
            group_id: record.group_id.clone(),
            batch_id: record.batch_id.clone(),
            stats: self.stats_for(record),
        });
    }
}

/// Completed and failed counts from per-recipient statuses.
///
/// Recipients are deduplicated by contact (the last report wins). Cancelled
/// calls count as failed. The result always satisfies
/// `completed + failed <= total`.
pub fn tally(snapshot: &ProviderSnapshot, total: u32) -> (u32, u32) {
    let latest: HashMap<&str, CallStatus> = snapshot
        .recipients
        .iter()
        .map(|r| (r.contact_id.as_str(), r.status))
        .collect();

    let mut completed: u32 = 0;
    let mut failed: u32 = 0;
    for status in latest.values() {
        match status {
            CallStatus::Completed => completed = completed.saturating_add(1),
            CallStatus::Failed | CallStatus::Cancelled => failed = failed.saturating_add(1),
            CallStatus::Pending | CallStatus::InProgress => {}
        }
    }

    let completed = completed.min(total);
    let failed = failed.min(total - completed);
    (completed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_config::model::StorageConfig;
    use outreach_core::RecipientCallState;
    use outreach_storage::SqliteStorage;
    use proptest::prelude::*;
    use tempfile::TempDir;

    async fn tracker() -> (BatchTracker, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("outreach.db").to_string_lossy().to_string(),
            message_log_path: dir.path().join("messages.db").to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let tracker = BatchTracker::new(
            Arc::new(storage),
            Arc::new(EventBus::new(16)),
            Duration::from_secs(3600),
        );
        (tracker, dir)
    }

    fn snapshot(status: CallStatus, statuses: &[(CallStatus, usize)]) -> ProviderSnapshot {
        let mut recipients = Vec::new();
        for (recipient_status, count) in statuses {
            for _ in 0..*count {
                recipients.push(RecipientCallState {
                    contact_id: format!("+1555{:04}", recipients.len()),
                    status: *recipient_status,
                });
            }
        }
        ProviderSnapshot {
            batch_id: "batch_12345".to_string(),
            status,
            recipients,
        }
    }

    #[tokio::test]
    async fn group_55_progress_then_completion() {
        let (tracker, _dir) = tracker().await;
        tracker
            .start_batch("55", "batch_12345", 15, serde_json::Value::Null)
            .await
            .unwrap();

        let partial = snapshot(
            CallStatus::InProgress,
            &[
                (CallStatus::Completed, 10),
                (CallStatus::Failed, 2),
                (CallStatus::InProgress, 3),
            ],
        );
        let record = tracker.reconcile("55", &partial).await.unwrap();
        assert_eq!(record.status, BatchStatus::InProgress);
        assert_eq!(record.completed_count, 10);
        assert_eq!(record.failed_count, 2);
        assert!(record.completed_at.is_none());
        assert_eq!(tracker.get_stats("55").await.unwrap().success_rate, 67);

        let done = snapshot(
            CallStatus::Completed,
            &[(CallStatus::Completed, 13), (CallStatus::Failed, 2)],
        );
        let record = tracker.reconcile("55", &done).await.unwrap();
        assert_eq!(record.status, BatchStatus::Completed);
        let completed_at = record.completed_at.expect("completed_at set");

        let stats = tracker.get_stats("55").await.unwrap();
        assert_eq!(stats.success_rate, 87);
        assert!(stats.has_been_called);
        assert!(!stats.stale);

        // A repeated terminal report must not move completed_at.
        let again = tracker.reconcile("55", &done).await.unwrap();
        assert_eq!(again.completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn second_start_while_in_progress_is_rejected() {
        let (tracker, _dir) = tracker().await;
        let first = tracker
            .start_batch("55", "batch_12345", 15, serde_json::json!({"run": 1}))
            .await
            .unwrap();
        let err = tracker
            .start_batch("55", "batch_99999", 3, serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::AlreadyInProgress { .. }));

        let current = tracker.get_record("55").await.unwrap().unwrap();
        assert_eq!(current.batch_id, first.batch_id);
        assert_eq!(current.total_recipients, 15);
        assert_eq!(current.metadata, serde_json::json!({"run": 1}));
    }

    #[tokio::test]
    async fn restart_after_terminal_resets_counters() {
        let (tracker, _dir) = tracker().await;
        tracker
            .start_batch("55", "batch_12345", 2, serde_json::Value::Null)
            .await
            .unwrap();
        tracker
            .reconcile(
                "55",
                &snapshot(CallStatus::Failed, &[(CallStatus::Failed, 2)]),
            )
            .await
            .unwrap();

        let record = tracker
            .start_batch("55", "batch_67890", 4, serde_json::Value::Null)
            .await
            .unwrap();
        assert_eq!(record.status, BatchStatus::InProgress);
        assert_eq!(record.failed_count, 0);
        assert!(record.completed_at.is_none());
        assert_eq!(record.batch_id, "batch_67890");
    }

    #[tokio::test]
    async fn reconcile_without_batch_fails() {
        let (tracker, _dir) = tracker().await;
        let err = tracker
            .reconcile("77", &snapshot(CallStatus::InProgress, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::NoBatchStarted { .. }));
        assert!(tracker.get_record("77").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn never_called_stats() {
        let (tracker, _dir) = tracker().await;
        let stats = tracker.get_stats("never").await.unwrap();
        assert_eq!(stats, BatchStats::never_called());
    }

    #[tokio::test]
    async fn terminal_status_never_regresses() {
        let (tracker, _dir) = tracker().await;
        tracker
            .start_batch("55", "batch_12345", 1, serde_json::Value::Null)
            .await
            .unwrap();
        tracker.cancel("55").await.unwrap();

        let record = tracker
            .reconcile(
                "55",
                &snapshot(CallStatus::InProgress, &[(CallStatus::Completed, 1)]),
            )
            .await
            .unwrap();
        assert_eq!(record.status, BatchStatus::Cancelled);
        assert_eq!(record.completed_count, 0);
    }

    #[tokio::test]
    async fn snapshot_for_other_batch_is_ignored() {
        let (tracker, _dir) = tracker().await;
        tracker
            .start_batch("55", "batch_new", 1, serde_json::Value::Null)
            .await
            .unwrap();
        let record = tracker
            .reconcile(
                "55",
                &snapshot(CallStatus::Completed, &[(CallStatus::Completed, 1)]),
            )
            .await
            .unwrap();
        assert_eq!(record.status, BatchStatus::InProgress);
        assert_eq!(record.completed_count, 0);
    }

    #[tokio::test]
    async fn old_in_progress_batch_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("outreach.db").to_string_lossy().to_string(),
            message_log_path: dir.path().join("messages.db").to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let storage = Arc::new(storage);
        let tracker = BatchTracker::new(
            storage.clone(),
            Arc::new(EventBus::new(16)),
            Duration::from_secs(60),
        );

        let mut record = tracker
            .start_batch("55", "batch_12345", 15, serde_json::Value::Null)
            .await
            .unwrap();
        record.started_at = Some(Utc::now() - chrono::Duration::minutes(5));
        storage.save_batch(&record).await.unwrap();

        assert!(tracker.get_stats("55").await.unwrap().stale);
        assert_eq!(tracker.list_stale().await.unwrap().len(), 1);
    }

    #[test]
    fn duplicate_recipients_are_counted_once() {
        let mut snap = snapshot(CallStatus::InProgress, &[(CallStatus::Completed, 2)]);
        snap.recipients.push(snap.recipients[0].clone());
        assert_eq!(tally(&snap, 10), (2, 0));
    }

    #[test]
    fn counts_are_clamped_to_total() {
        let snap = snapshot(
            CallStatus::InProgress,
            &[(CallStatus::Completed, 4), (CallStatus::Cancelled, 3)],
        );
        assert_eq!(tally(&snap, 5), (4, 1));
        assert_eq!(tally(&snap, 3), (3, 0));
    }

    fn arb_status() -> impl Strategy<Value = CallStatus> {
        prop_oneof![
            Just(CallStatus::Pending),
            Just(CallStatus::InProgress),
            Just(CallStatus::Completed),
            Just(CallStatus::Failed),
            Just(CallStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn tally_never_exceeds_total(
            statuses in proptest::collection::vec((0u8..40, arb_status()), 0..80),
            total in 0u32..50,
        ) {
            let snap = ProviderSnapshot {
                batch_id: "b".to_string(),
                status: CallStatus::InProgress,
                recipients: statuses
                    .into_iter()
                    .map(|(id, status)| RecipientCallState {
                        contact_id: id.to_string(),
                        status,
                    })
                    .collect(),
            };
            let (completed, failed) = tally(&snap, total);
            prop_assert!(completed + failed <= total);
        }
    }
}
