// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic provider polling for in-flight batches.
//!
//! One monitor runs per group. Each cycle fetches the provider snapshot,
//! folds it into the tracker, and fires the follow-up hook for recipients
//! whose calls have finished. A monitor stops when the batch is terminal,
//! when it is cancelled, or when it hits the polling ceiling.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use outreach_config::model::MonitorConfig;
use outreach_core::{
    BatchCallRecord, BatchStatus, CallProvider, FollowUpRecord, FollowUpState, OutreachError,
    ProviderSnapshot, StorageAdapter,
};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::follow_up::FollowUpHook;
use crate::tracker::BatchTracker;

/// Polling cadence and ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_duration: Duration,
    pub max_polls: u32,
    pub fetch_timeout: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_duration: Duration::from_secs(config.max_duration_secs),
            max_polls: config.max_polls,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

/// Why a monitor stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorExit {
    /// The batch reached a terminal status.
    Terminal(BatchStatus),
    Cancelled,
    /// The polling ceiling was hit while the batch was still running.
    Abandoned,
    /// The group moved on to a different batch.
    Superseded,
    /// A non-transient error ended polling.
    Aborted(String),
}

/// Handle to one running (or finished) monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    group_id: String,
    batch_id: String,
    token: CancellationToken,
    exit: watch::Receiver<Option<MonitorExit>>,
}

impl MonitorHandle {
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Requests the monitor to stop after its current cycle.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.exit.borrow().is_some()
    }

    /// Waits for the monitor to stop and returns the reason.
    pub async fn wait(&self) -> MonitorExit {
        let mut exit = self.exit.clone();
        match exit.wait_for(Option::is_some).await {
            Ok(value) => value
                .clone()
                .unwrap_or_else(|| MonitorExit::Aborted("monitor exited without a result".into())),
            Err(_) => MonitorExit::Aborted("monitor task dropped".into()),
        }
    }
}

/// Owns every batch monitor and the follow-up jobs they start.
pub struct ProgressMonitor {
    tracker: Arc<BatchTracker>,
    provider: Arc<dyn CallProvider>,
    storage: Arc<dyn StorageAdapter>,
    hook: Arc<dyn FollowUpHook>,
    settings: MonitorSettings,
    active: DashMap<String, MonitorHandle>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl ProgressMonitor {
    pub fn new(
        tracker: Arc<BatchTracker>,
        provider: Arc<dyn CallProvider>,
        storage: Arc<dyn StorageAdapter>,
        hook: Arc<dyn FollowUpHook>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            tracker,
            provider,
            storage,
            hook,
            settings,
            active: DashMap::new(),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Starts polling `batch_id` for the group.
    ///
    /// A live monitor for the same batch is reused. A live monitor for a
    /// different batch of the same group is cancelled first, so at most one
    /// monitor polls any group.
    pub fn spawn(self: &Arc<Self>, group_id: &str, batch_id: &str) -> MonitorHandle {
        let deadline = Instant::now() + self.settings.max_duration;
        self.spawn_until(group_id, batch_id, deadline)
    }

    /// Starts polling a batch that began at `started_at`, possibly in an
    /// earlier process.
    ///
    /// The duration ceiling counts from `started_at`, so a resumed monitor
    /// only polls for what is left of the batch's budget.
    pub fn resume(
        self: &Arc<Self>,
        group_id: &str,
        batch_id: &str,
        started_at: DateTime<Utc>,
    ) -> MonitorHandle {
        let elapsed = (Utc::now() - started_at).to_std().unwrap_or_default();
        let remaining = self.settings.max_duration.saturating_sub(elapsed);
        self.spawn_until(group_id, batch_id, Instant::now() + remaining)
    }

    fn spawn_until(
        self: &Arc<Self>,
        group_id: &str,
        batch_id: &str,
        deadline: Instant,
    ) -> MonitorHandle {
        let existing = self.active.get(group_id).map(|entry| entry.value().clone());
        if let Some(existing) = existing {
            if existing.batch_id == batch_id && !existing.is_finished() {
                return existing;
            }
            existing.cancel();
        }

        let token = self.shutdown.child_token();
        let (tx, rx) = watch::channel(None);
        let handle = MonitorHandle {
            group_id: group_id.to_string(),
            batch_id: batch_id.to_string(),
            token: token.clone(),
            exit: rx,
        };
        self.active.insert(group_id.to_string(), handle.clone());

        let monitor = Arc::clone(self);
        let group = group_id.to_string();
        let batch = batch_id.to_string();
        self.tasks.spawn(async move {
            let exit = monitor.run(&group, &batch, deadline, &token).await;
            monitor
                .active
                .remove_if(&group, |_, handle| handle.batch_id == batch);
            info!(group_id = %group, batch_id = %batch, exit = ?exit, "batch monitor stopped");
            tx.send_replace(Some(exit));
        });
        handle
    }

    /// Stops the group's monitor, if one is running.
    pub fn stop(&self, group_id: &str) -> bool {
        match self.active.remove(group_id) {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// The group's live monitor.
    pub fn handle(&self, group_id: &str) -> Option<MonitorHandle> {
        self.active
            .get(group_id)
            .map(|entry| entry.value().clone())
            .filter(|handle| !handle.is_finished())
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Runs one poll cycle for the group outside the schedule.
    ///
    /// Fetches the snapshot, reconciles it, and dispatches follow-ups for
    /// finished recipients. Returns the group's record after the cycle.
    pub async fn poll_once(
        &self,
        group_id: &str,
        batch_id: &str,
    ) -> Result<BatchCallRecord, OutreachError> {
        let snapshot = self.fetch(batch_id).await?;
        let record = self.tracker.reconcile(group_id, &snapshot).await?;
        if record.batch_id == snapshot.batch_id {
            self.dispatch_follow_ups(&snapshot).await?;
        }
        Ok(record)
    }

    /// Cancels every monitor and waits for in-flight follow-up jobs.
    pub async fn drain(&self) {
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        self.active.clear();
    }

    async fn run(
        &self,
        group_id: &str,
        batch_id: &str,
        deadline: Instant,
        token: &CancellationToken,
    ) -> MonitorExit {
        let mut polls: u32 = 0;

        loop {
            if token.is_cancelled() {
                return MonitorExit::Cancelled;
            }
            if polls >= self.settings.max_polls || Instant::now() >= deadline {
                warn!(group_id, batch_id, polls, "polling ceiling reached, batch abandoned");
                return MonitorExit::Abandoned;
            }
            polls += 1;

            match self.poll_once(group_id, batch_id).await {
                Ok(record) if record.batch_id != batch_id => return MonitorExit::Superseded,
                Ok(record) if record.status.is_terminal() => {
                    return MonitorExit::Terminal(record.status);
                }
                Ok(record) => {
                    debug!(
                        group_id,
                        batch_id,
                        polls,
                        completed = record.completed_count,
                        failed = record.failed_count,
                        "poll cycle complete"
                    );
                }
                Err(e) if e.is_transient() => {
                    warn!(group_id, batch_id, error = %e, "poll failed, retrying next cycle");
                }
                Err(e) => {
                    error!(group_id, batch_id, error = %e, "poll failed, monitor stopping");
                    return MonitorExit::Aborted(e.to_string());
                }
            }

            // The last sleep is cut short so the ceiling is checked on time.
            let wake = (Instant::now() + self.settings.poll_interval).min(deadline);
            tokio::select! {
                _ = token.cancelled() => return MonitorExit::Cancelled,
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    async fn fetch(&self, batch_id: &str) -> Result<ProviderSnapshot, OutreachError> {
        let timeout = self.settings.fetch_timeout;
        tokio::time::timeout(timeout, self.provider.get_batch_status(batch_id))
            .await
            .map_err(|_| OutreachError::Timeout { duration: timeout })?
    }

    async fn dispatch_follow_ups(&self, snapshot: &ProviderSnapshot) -> Result<(), OutreachError> {
        let mut seen = HashSet::new();
        for recipient in &snapshot.recipients {
            if !recipient.status.is_terminal() || !seen.insert(recipient.contact_id.as_str()) {
                continue;
            }

            let claim = FollowUpRecord {
                batch_id: snapshot.batch_id.clone(),
                contact_id: recipient.contact_id.clone(),
                recipient_status: recipient.status,
                state: FollowUpState::Pending,
                error: None,
                claimed_at: Utc::now(),
                finished_at: None,
            };
            if !self.storage.claim_follow_up(&claim).await? {
                continue;
            }

            let storage = Arc::clone(&self.storage);
            let hook = Arc::clone(&self.hook);
            let batch_id = snapshot.batch_id.clone();
            let recipient = recipient.clone();
            self.tasks.spawn(async move {
                let (state, failure) = match hook.on_recipient_terminal(&batch_id, &recipient).await
                {
                    Ok(()) => (FollowUpState::Delivered, None),
                    Err(e) => {
                        error!(
                            batch_id = %batch_id,
                            contact_id = %recipient.contact_id,
                            error = %e,
                            "follow-up failed"
                        );
                        (FollowUpState::Failed, Some(e.to_string()))
                    }
                };
                if let Err(e) = storage
                    .finish_follow_up(&batch_id, &recipient.contact_id, state, failure)
                    .await
                {
                    error!(
                        batch_id = %batch_id,
                        contact_id = %recipient.contact_id,
                        error = %e,
                        "failed to record follow-up outcome"
                    );
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_from_config() {
        let config = MonitorConfig::default();
        let settings = MonitorSettings::from(&config);
        assert_eq!(settings.poll_interval, Duration::from_secs(30));
        assert_eq!(settings.max_duration, Duration::from_secs(3600));
        assert_eq!(settings.max_polls, 120);
        assert_eq!(settings.fetch_timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn handle_reports_exit() {
        let (tx, rx) = watch::channel(None);
        let handle = MonitorHandle {
            group_id: "55".into(),
            batch_id: "batch_12345".into(),
            token: CancellationToken::new(),
            exit: rx,
        };
        assert!(!handle.is_finished());
        tx.send_replace(Some(MonitorExit::Cancelled));
        assert!(handle.is_finished());
        assert_eq!(handle.wait().await, MonitorExit::Cancelled);
    }

    #[tokio::test]
    async fn dropped_sender_reports_abort() {
        let (tx, rx) = watch::channel(None);
        let handle = MonitorHandle {
            group_id: "55".into(),
            batch_id: "batch_12345".into(),
            token: CancellationToken::new(),
            exit: rx,
        };
        drop(tx);
        assert!(matches!(handle.wait().await, MonitorExit::Aborted(_)));
    }
}
