// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational storage trait: conversations, agents, batch records and the
//! follow-up ledger.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Agent, BatchCallRecord, ConversationRecord, FollowUpRecord, FollowUpState};

/// Adapter for the authoritative relational store.
///
/// Implementations provide row-level atomicity only. Callers serialize
/// read-modify-write sequences on a key with their own locks.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), OutreachError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), OutreachError>;

    // --- Conversations ---

    async fn get_conversation(
        &self,
        contact_id: &str,
    ) -> Result<Option<ConversationRecord>, OutreachError>;

    /// Inserts the record unless one already exists for its contact.
    /// Returns `true` when the row was created.
    async fn insert_conversation_if_absent(
        &self,
        record: &ConversationRecord,
    ) -> Result<bool, OutreachError>;

    async fn update_conversation(&self, record: &ConversationRecord) -> Result<(), OutreachError>;

    /// Most recently updated conversations first.
    async fn list_conversations(&self, limit: i64) -> Result<Vec<ConversationRecord>, OutreachError>;

    // --- Agents ---

    async fn upsert_agent(&self, agent: &Agent) -> Result<(), OutreachError>;

    async fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>, OutreachError>;

    async fn list_agents(&self) -> Result<Vec<Agent>, OutreachError>;

    // --- Batch records ---

    async fn get_batch(&self, group_id: &str) -> Result<Option<BatchCallRecord>, OutreachError>;

    /// Inserts or replaces the current lifecycle instance for the group.
    async fn save_batch(&self, record: &BatchCallRecord) -> Result<(), OutreachError>;

    async fn list_batches(&self) -> Result<Vec<BatchCallRecord>, OutreachError>;

    // --- Follow-up ledger ---

    /// Atomically claims `(batch_id, contact_id)`. Returns `true` only for the
    /// single caller that created the ledger row.
    async fn claim_follow_up(&self, record: &FollowUpRecord) -> Result<bool, OutreachError>;

    /// Records the outcome of a claimed follow-up.
    async fn finish_follow_up(
        &self,
        batch_id: &str,
        contact_id: &str,
        state: FollowUpState,
        error: Option<String>,
    ) -> Result<(), OutreachError>;

    async fn list_follow_ups(&self, batch_id: &str) -> Result<Vec<FollowUpRecord>, OutreachError>;
}
