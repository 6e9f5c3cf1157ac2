// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation record operations.

use outreach_core::{ConversationRecord, OutreachError};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::queries::{json_column, parse_column};

const CONVERSATION_COLUMNS: &str = "contact_id, last_outbound_text, has_started, bound_agent_id, \
     extra_state, lifecycle, created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        contact_id: row.get(0)?,
        last_outbound_text: row.get(1)?,
        has_started: row.get(2)?,
        bound_agent_id: row.get(3)?,
        extra_state: json_column(row, 4)?.unwrap_or_default(),
        lifecycle: parse_column(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn extra_state_json(record: &ConversationRecord) -> Result<String, OutreachError> {
    serde_json::to_string(&record.extra_state).map_err(OutreachError::storage)
}

pub async fn get_conversation(
    db: &Database,
    contact_id: &str,
) -> Result<Option<ConversationRecord>, OutreachError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationRecord>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE contact_id = ?1"),
                params![contact_id],
                row_to_conversation,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert the record unless a row already exists for its contact.
///
/// Returns `true` when this call created the row.
pub async fn insert_conversation_if_absent(
    db: &Database,
    record: &ConversationRecord,
) -> Result<bool, OutreachError> {
    let extra_state = extra_state_json(record)?;
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO conversations
                    (contact_id, last_outbound_text, has_started, bound_agent_id, extra_state, lifecycle, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.contact_id,
                    record.last_outbound_text,
                    record.has_started,
                    record.bound_agent_id,
                    extra_state,
                    record.lifecycle.to_string(),
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Overwrite the mutable fields of an existing conversation.
pub async fn update_conversation(
    db: &Database,
    record: &ConversationRecord,
) -> Result<(), OutreachError> {
    let extra_state = extra_state_json(record)?;
    let record = record.clone();
    let contact_id = record.contact_id.clone();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET
                    last_outbound_text = ?2,
                    has_started = ?3,
                    bound_agent_id = ?4,
                    extra_state = ?5,
                    lifecycle = ?6,
                    updated_at = ?7
                 WHERE contact_id = ?1",
                params![
                    record.contact_id,
                    record.last_outbound_text,
                    record.has_started,
                    record.bound_agent_id,
                    extra_state,
                    record.lifecycle.to_string(),
                    record.updated_at,
                ],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if updated == 0 {
        return Err(OutreachError::ConversationNotFound { contact_id });
    }
    Ok(())
}

/// Most recently updated conversations first.
pub async fn list_conversations(
    db: &Database,
    limit: i64,
) -> Result<Vec<ConversationRecord>, OutreachError> {
    db.connection()
        .call(move |conn| -> Result<Vec<ConversationRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 ORDER BY updated_at DESC, contact_id ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_conversation)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
