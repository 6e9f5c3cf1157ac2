// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up ledger operations.
//!
//! A row's existence is the dedup marker for the one-shot side effect of a
//! `(batch_id, contact_id)` pair.

use chrono::Utc;
use outreach_core::{FollowUpRecord, FollowUpState, OutreachError};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_column;

fn row_to_follow_up(row: &rusqlite::Row<'_>) -> rusqlite::Result<FollowUpRecord> {
    Ok(FollowUpRecord {
        batch_id: row.get(0)?,
        contact_id: row.get(1)?,
        recipient_status: parse_column(row, 2)?,
        state: parse_column(row, 3)?,
        error: row.get(4)?,
        claimed_at: row.get(5)?,
        finished_at: row.get(6)?,
    })
}

/// Claim the pair. Only the caller whose insert created the row gets `true`.
pub async fn claim_follow_up(db: &Database, record: &FollowUpRecord) -> Result<bool, OutreachError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follow_ups
                    (batch_id, contact_id, recipient_status, state, error, claimed_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.batch_id,
                    record.contact_id,
                    record.recipient_status.to_string(),
                    record.state.to_string(),
                    record.error,
                    record.claimed_at,
                    record.finished_at,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn finish_follow_up(
    db: &Database,
    batch_id: &str,
    contact_id: &str,
    state: FollowUpState,
    error: Option<String>,
) -> Result<(), OutreachError> {
    let batch_id = batch_id.to_string();
    let contact_id = contact_id.to_string();
    let finished_at = Utc::now();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE follow_ups SET state = ?3, error = ?4, finished_at = ?5
                 WHERE batch_id = ?1 AND contact_id = ?2",
                params![batch_id, contact_id, state.to_string(), error, finished_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_follow_ups(db: &Database, batch_id: &str) -> Result<Vec<FollowUpRecord>, OutreachError> {
    let batch_id = batch_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<FollowUpRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT batch_id, contact_id, recipient_status, state, error, claimed_at, finished_at
                 FROM follow_ups WHERE batch_id = ?1 ORDER BY claimed_at ASC, contact_id ASC",
            )?;
            let rows = stmt.query_map(params![batch_id], row_to_follow_up)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
