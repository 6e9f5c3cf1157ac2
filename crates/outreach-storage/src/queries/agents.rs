// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent CRUD operations.

use outreach_core::{Agent, OutreachError};
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

const AGENT_COLUMNS: &str =
    "id, name, system_instruction, language, is_active, owner_id, created_at, updated_at";

fn row_to_agent(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        system_instruction: row.get(2)?,
        language: row.get(3)?,
        is_active: row.get(4)?,
        owner_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert an agent or overwrite every mutable field of an existing one.
/// `created_at` of an existing row is preserved.
pub async fn upsert_agent(db: &Database, agent: &Agent) -> Result<(), OutreachError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO agents (id, name, system_instruction, language, is_active, owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    system_instruction = excluded.system_instruction,
                    language = excluded.language,
                    is_active = excluded.is_active,
                    owner_id = excluded.owner_id,
                    updated_at = excluded.updated_at",
                params![
                    agent.id,
                    agent.name,
                    agent.system_instruction,
                    agent.language,
                    agent.is_active,
                    agent.owner_id,
                    agent.created_at,
                    agent.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_agent(db: &Database, id: &str) -> Result<Option<Agent>, OutreachError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Agent>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                row_to_agent,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_agents(db: &Database) -> Result<Vec<Agent>, OutreachError> {
    db.connection()
        .call(|conn| -> Result<Vec<Agent>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at ASC, id ASC"))?;
            let rows = stmt.query_map([], row_to_agent)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Schema;
    use chrono::Utc;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("agents.db");
        let db = Database::open(db_path.to_str().unwrap(), Schema::Relational, true)
            .await
            .unwrap();
        (db, dir)
    }

    fn make_agent(id: &str, active: bool) -> Agent {
        let now = Utc::now();
        Agent {
            id: id.to_string(),
            name: format!("Agent {id}"),
            system_instruction: "You are a helpful sales assistant.".to_string(),
            language: "es".to_string(),
            is_active: active,
            owner_id: "owner-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let (db, _dir) = setup_db().await;
        let agent = make_agent("agent-1", true);
        upsert_agent(&db, &agent).await.unwrap();

        let loaded = get_agent(&db, "agent-1").await.unwrap().unwrap();
        assert_eq!(loaded, agent);
        assert!(get_agent(&db, "missing").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_overwrites_fields_but_keeps_created_at() {
        let (db, _dir) = setup_db().await;
        let original = make_agent("agent-1", true);
        upsert_agent(&db, &original).await.unwrap();

        let mut changed = original.clone();
        changed.is_active = false;
        changed.language = "en".to_string();
        changed.created_at = Utc::now() + chrono::Duration::days(1);
        upsert_agent(&db, &changed).await.unwrap();

        let loaded = get_agent(&db, "agent-1").await.unwrap().unwrap();
        assert!(!loaded.is_active);
        assert_eq!(loaded.language, "en");
        assert_eq!(loaded.created_at, original.created_at);
        assert_eq!(list_agents(&db).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }
}
