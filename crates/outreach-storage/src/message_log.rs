// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the append-only message log.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use outreach_config::model::StorageConfig;
use outreach_core::{
    AdapterType, HealthStatus, MessageLogAdapter, MessageLogEntry, OutreachError, PluginAdapter,
};

use crate::database::Database;
use crate::migrations::Schema;
use crate::queries;

/// Message log stored in its own SQLite file, separate from the relational
/// store so the two can be placed and backed up independently.
pub struct SqliteMessageLog {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteMessageLog {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, OutreachError> {
        self.db.get().ok_or_else(|| OutreachError::Storage {
            source: "message log not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteMessageLog {
    fn name(&self) -> &str {
        "sqlite-message-log"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MessageLog
    }

    async fn health_check(&self) -> Result<HealthStatus, OutreachError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OutreachError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MessageLogAdapter for SqliteMessageLog {
    async fn initialize(&self) -> Result<(), OutreachError> {
        let db = Database::open(
            &self.config.message_log_path,
            Schema::MessageLog,
            self.config.wal_mode,
        )
        .await?;
        self.db.set(db).map_err(|_| OutreachError::Storage {
            source: "message log already initialized".into(),
        })?;
        debug!(path = %self.config.message_log_path, "message log initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), OutreachError> {
        self.db()?.checkpoint().await
    }

    async fn append(&self, entry: &MessageLogEntry) -> Result<(), OutreachError> {
        queries::messages::append_entry(self.db()?, entry).await
    }

    async fn recent(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageLogEntry>, OutreachError> {
        queries::messages::recent_entries(self.db()?, contact_id, limit).await
    }
}
