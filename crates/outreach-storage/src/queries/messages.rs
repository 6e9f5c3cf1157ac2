// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations. The table rejects updates and deletes.

use outreach_core::{MessageLogEntry, OutreachError};
use rusqlite::params;

use crate::database::Database;
use crate::queries::{json_column, parse_column};

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageLogEntry> {
    Ok(MessageLogEntry {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        direction: parse_column(row, 2)?,
        content: row.get(3)?,
        external_message_id: row.get(4)?,
        timestamp: row.get(5)?,
        metadata: json_column(row, 6)?.unwrap_or(serde_json::Value::Null),
    })
}

pub async fn append_entry(db: &Database, entry: &MessageLogEntry) -> Result<(), OutreachError> {
    let metadata = serde_json::to_string(&entry.metadata).map_err(OutreachError::storage)?;
    let entry = entry.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO message_log
                    (id, contact_id, direction, content, external_message_id, timestamp, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.id,
                    entry.contact_id,
                    entry.direction.to_string(),
                    entry.content,
                    entry.external_message_id,
                    entry.timestamp,
                    metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The `limit` most recent entries for a contact in chronological order.
pub async fn recent_entries(
    db: &Database,
    contact_id: &str,
    limit: usize,
) -> Result<Vec<MessageLogEntry>, OutreachError> {
    let contact_id = contact_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<MessageLogEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, contact_id, direction, content, external_message_id, timestamp, metadata
                 FROM message_log WHERE contact_id = ?1
                 ORDER BY timestamp DESC, seq DESC LIMIT ?2",
            )?;
            let mut entries = stmt
                .query_map(params![contact_id, limit], row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            entries.reverse();
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Schema;
    use chrono::{TimeZone, Utc};
    use outreach_core::Direction;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.db");
        let db = Database::open(db_path.to_str().unwrap(), Schema::MessageLog, true)
            .await
            .unwrap();
        (db, dir)
    }

    fn entry_at(contact: &str, content: &str, second: u32) -> MessageLogEntry {
        let mut entry = MessageLogEntry::new(contact, Direction::Received, content);
        entry.timestamp = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, second).unwrap();
        entry
    }

    #[tokio::test]
    async fn recent_returns_latest_window_oldest_first() {
        let (db, _dir) = setup_db().await;
        for i in 0..15 {
            append_entry(&db, &entry_at("+15550001", &format!("msg {i}"), i))
                .await
                .unwrap();
        }
        append_entry(&db, &entry_at("+15559999", "other contact", 59))
            .await
            .unwrap();

        let recent = recent_entries(&db, "+15550001", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "msg 5");
        assert_eq!(recent[9].content, "msg 14");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let (db, _dir) = setup_db().await;
        for content in ["first", "second", "third"] {
            append_entry(&db, &entry_at("+15550001", content, 7)).await.unwrap();
        }
        let recent = recent_entries(&db, "+15550001", 2).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["second", "third"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn entries_cannot_be_modified() {
        let (db, _dir) = setup_db().await;
        append_entry(&db, &entry_at("+15550001", "hello", 1)).await.unwrap();

        let result = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute("UPDATE message_log SET content = 'edited'", [])
            })
            .await;
        assert!(result.is_err());

        let result = db
            .connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute("DELETE FROM message_log", [])
            })
            .await;
        assert!(result.is_err());
        assert_eq!(recent_entries(&db, "+15550001", 10).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn metadata_and_external_id_persist() {
        let (db, _dir) = setup_db().await;
        let entry = MessageLogEntry::new("+15550001", Direction::Sent, "hola")
            .with_external_id(Some("wamid.ABC".to_string()))
            .with_metadata(serde_json::json!({"agent_id": "agent-1"}));
        append_entry(&db, &entry).await.unwrap();

        let loaded = recent_entries(&db, "+15550001", 1).await.unwrap();
        assert_eq!(loaded[0], entry);
        db.close().await.unwrap();
    }
}
