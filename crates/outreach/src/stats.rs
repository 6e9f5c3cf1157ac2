// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `outreach stats` command implementation.
//!
//! Reads batch records straight from the relational database, so it works
//! whether or not a server is running.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use outreach_bus::EventBus;
use outreach_campaign::{BatchSummary, BatchTracker};
use outreach_config::OutreachConfig;
use outreach_core::{BatchStats, BatchStatus, OutreachError, StorageAdapter};
use outreach_storage::SqliteStorage;

pub async fn run_stats(
    config: &OutreachConfig,
    group: Option<&str>,
    json: bool,
    plain: bool,
) -> Result<(), OutreachError> {
    let sqlite = SqliteStorage::new(config.storage.clone());
    sqlite.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);
    let tracker = BatchTracker::new(
        storage.clone(),
        Arc::new(EventBus::new(1)),
        Duration::from_secs(config.monitor.max_duration_secs),
    );

    let rows = collect(&tracker, group).await?;
    storage.close().await?;

    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| OutreachError::Internal(format!("failed to encode stats: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  outreach stats");
    println!("  {}", "-".repeat(60));
    if rows.is_empty() {
        println!("    no batches recorded");
    }
    for row in &rows {
        println!("{}", format_row(row, use_color));
    }
    println!();
    Ok(())
}

async fn collect(
    tracker: &BatchTracker,
    group: Option<&str>,
) -> Result<Vec<BatchSummary>, OutreachError> {
    match group {
        Some(group_id) => {
            let stats = tracker.get_stats(group_id).await?;
            let batch_id = tracker
                .get_record(group_id)
                .await?
                .map(|record| record.batch_id)
                .unwrap_or_default();
            Ok(vec![BatchSummary {
                group_id: group_id.to_string(),
                batch_id,
                stats,
            }])
        }
        None => Ok(tracker
            .list_batches()
            .await?
            .iter()
            .map(|record| BatchSummary {
                group_id: record.group_id.clone(),
                batch_id: record.batch_id.clone(),
                stats: tracker.stats_for(record),
            })
            .collect()),
    }
}

fn status_label(stats: &BatchStats) -> String {
    if !stats.has_been_called {
        return "never called".to_string();
    }
    if stats.stale {
        return format!("{} (stale)", stats.status);
    }
    stats.status.to_string()
}

fn format_row(row: &BatchSummary, use_color: bool) -> String {
    let stats = &row.stats;
    let label = status_label(stats);
    let label = if use_color {
        use colored::Colorize;
        match stats.status {
            _ if stats.stale => label.yellow().to_string(),
            BatchStatus::Completed => label.green().to_string(),
            BatchStatus::Failed | BatchStatus::Cancelled => label.red().to_string(),
            _ => label,
        }
    } else {
        label
    };
    format!(
        "    {:<12} {:<20} {:<24} {:>3}% ({} ok / {} failed / {} total)",
        row.group_id,
        row.batch_id,
        label,
        stats.success_rate,
        stats.completed_count,
        stats.failed_count,
        stats.total_recipients
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_config::model::StorageConfig;

    fn config(dir: &tempfile::TempDir) -> OutreachConfig {
        let mut config = OutreachConfig::default();
        config.storage = StorageConfig {
            database_path: dir.path().join("outreach.db").to_string_lossy().to_string(),
            message_log_path: dir.path().join("messages.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        config
    }

    #[tokio::test]
    async fn unknown_group_is_never_called() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let sqlite = SqliteStorage::new(config.storage.clone());
        sqlite.initialize().await.unwrap();
        let tracker = BatchTracker::new(
            Arc::new(sqlite),
            Arc::new(EventBus::new(1)),
            Duration::from_secs(3600),
        );

        let rows = collect(&tracker, Some("77")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stats, BatchStats::never_called());
        assert!(rows[0].batch_id.is_empty());
        assert!(collect(&tracker, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn started_batch_is_listed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let sqlite = SqliteStorage::new(config.storage.clone());
        sqlite.initialize().await.unwrap();
        let tracker = BatchTracker::new(
            Arc::new(sqlite),
            Arc::new(EventBus::new(1)),
            Duration::from_secs(3600),
        );
        tracker
            .start_batch("55", "batch_12345", 15, serde_json::Value::Null)
            .await
            .unwrap();

        let rows = collect(&tracker, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].batch_id, "batch_12345");
        assert_eq!(rows[0].stats.status, BatchStatus::InProgress);
    }

    #[test]
    fn plain_row_shows_rate_and_counts() {
        let mut stats = BatchStats::never_called();
        stats.has_been_called = true;
        stats.status = BatchStatus::InProgress;
        stats.total_recipients = 15;
        stats.completed_count = 10;
        stats.failed_count = 1;
        stats.success_rate = 67;
        let row = BatchSummary {
            group_id: "55".into(),
            batch_id: "batch_12345".into(),
            stats,
        };
        let line = format_row(&row, false);
        assert!(line.contains("in_progress"));
        assert!(line.contains("67%"));
        assert!(line.contains("10 ok / 1 failed / 15 total"));
    }

    #[test]
    fn stale_label_is_marked() {
        let mut stats = BatchStats::never_called();
        stats.has_been_called = true;
        stats.status = BatchStatus::InProgress;
        stats.stale = true;
        assert_eq!(status_label(&stats), "in_progress (stale)");
    }
}
