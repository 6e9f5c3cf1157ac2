// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-call record operations. One row per group holds the current
//! lifecycle instance.

use outreach_core::{BatchCallRecord, OutreachError};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::queries::{json_column, parse_column};

const BATCH_COLUMNS: &str = "group_id, batch_id, status, started_at, completed_at, \
     total_recipients, completed_count, failed_count, raw_provider_snapshot, metadata, updated_at";

fn row_to_batch(row: &rusqlite::Row<'_>) -> rusqlite::Result<BatchCallRecord> {
    Ok(BatchCallRecord {
        group_id: row.get(0)?,
        batch_id: row.get(1)?,
        status: parse_column(row, 2)?,
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        total_recipients: row.get(5)?,
        completed_count: row.get(6)?,
        failed_count: row.get(7)?,
        raw_provider_snapshot: json_column(row, 8)?,
        metadata: json_column(row, 9)?.unwrap_or(serde_json::Value::Null),
        updated_at: row.get(10)?,
    })
}

pub async fn get_batch(db: &Database, group_id: &str) -> Result<Option<BatchCallRecord>, OutreachError> {
    let group_id = group_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<BatchCallRecord>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {BATCH_COLUMNS} FROM batch_calls WHERE group_id = ?1"),
                params![group_id],
                row_to_batch,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace the group's current lifecycle instance.
pub async fn save_batch(db: &Database, record: &BatchCallRecord) -> Result<(), OutreachError> {
    let snapshot = record
        .raw_provider_snapshot
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(OutreachError::storage)?;
    let metadata = serde_json::to_string(&record.metadata).map_err(OutreachError::storage)?;
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO batch_calls
                    (group_id, batch_id, status, started_at, completed_at, total_recipients,
                     completed_count, failed_count, raw_provider_snapshot, metadata, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(group_id) DO UPDATE SET
                    batch_id = excluded.batch_id,
                    status = excluded.status,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    total_recipients = excluded.total_recipients,
                    completed_count = excluded.completed_count,
                    failed_count = excluded.failed_count,
                    raw_provider_snapshot = excluded.raw_provider_snapshot,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at",
                params![
                    record.group_id,
                    record.batch_id,
                    record.status.to_string(),
                    record.started_at,
                    record.completed_at,
                    record.total_recipients,
                    record.completed_count,
                    record.failed_count,
                    snapshot,
                    metadata,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All batch records, most recently updated first.
pub async fn list_batches(db: &Database) -> Result<Vec<BatchCallRecord>, OutreachError> {
    db.connection()
        .call(|conn| -> Result<Vec<BatchCallRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BATCH_COLUMNS} FROM batch_calls ORDER BY updated_at DESC, group_id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_batch)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
