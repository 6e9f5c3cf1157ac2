// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the relational StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use outreach_config::model::StorageConfig;
use outreach_core::{
    AdapterType, Agent, BatchCallRecord, ConversationRecord, FollowUpRecord, FollowUpState,
    HealthStatus, OutreachError, PluginAdapter, StorageAdapter,
};

use crate::database::Database;
use crate::migrations::Schema;
use crate::queries;

/// SQLite-backed relational store.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, OutreachError> {
        self.db.get().ok_or_else(|| OutreachError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
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
            debug!("relational store: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), OutreachError> {
        let db = Database::open(
            &self.config.database_path,
            Schema::Relational,
            self.config.wal_mode,
        )
        .await?;
        self.db.set(db).map_err(|_| OutreachError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "relational store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), OutreachError> {
        self.db()?.checkpoint().await?;
        debug!("relational store: WAL checkpoint complete");
        Ok(())
    }

    async fn get_conversation(
        &self,
        contact_id: &str,
    ) -> Result<Option<ConversationRecord>, OutreachError> {
        queries::conversations::get_conversation(self.db()?, contact_id).await
    }

    async fn insert_conversation_if_absent(
        &self,
        record: &ConversationRecord,
    ) -> Result<bool, OutreachError> {
        queries::conversations::insert_conversation_if_absent(self.db()?, record).await
    }

    async fn update_conversation(&self, record: &ConversationRecord) -> Result<(), OutreachError> {
        queries::conversations::update_conversation(self.db()?, record).await
    }

    async fn list_conversations(&self, limit: i64) -> Result<Vec<ConversationRecord>, OutreachError> {
        queries::conversations::list_conversations(self.db()?, limit).await
    }

    async fn upsert_agent(&self, agent: &Agent) -> Result<(), OutreachError> {
        queries::agents::upsert_agent(self.db()?, agent).await
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, OutreachError> {
        queries::agents::get_agent(self.db()?, agent_id).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, OutreachError> {
        queries::agents::list_agents(self.db()?).await
    }

    async fn get_batch(&self, group_id: &str) -> Result<Option<BatchCallRecord>, OutreachError> {
        queries::batches::get_batch(self.db()?, group_id).await
    }

    async fn save_batch(&self, record: &BatchCallRecord) -> Result<(), OutreachError> {
        queries::batches::save_batch(self.db()?, record).await
    }

    async fn list_batches(&self) -> Result<Vec<BatchCallRecord>, OutreachError> {
        queries::batches::list_batches(self.db()?).await
    }

    async fn claim_follow_up(&self, record: &FollowUpRecord) -> Result<bool, OutreachError> {
        queries::follow_ups::claim_follow_up(self.db()?, record).await
    }

    async fn finish_follow_up(
        &self,
        batch_id: &str,
        contact_id: &str,
        state: FollowUpState,
        error: Option<String>,
    ) -> Result<(), OutreachError> {
        queries::follow_ups::finish_follow_up(self.db()?, batch_id, contact_id, state, error).await
    }

    async fn list_follow_ups(&self, batch_id: &str) -> Result<Vec<FollowUpRecord>, OutreachError> {
        queries::follow_ups::list_follow_ups(self.db()?, batch_id).await
    }
}
