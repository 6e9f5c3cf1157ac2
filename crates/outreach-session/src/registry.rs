// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-contact conversation records and agent bindings.

use std::sync::Arc;

use chrono::Utc;
use outreach_bus::{BusEvent, EventBus};
use outreach_core::{
    Agent, ConversationRecord, KeyedMutex, MessageLogAdapter, MessageLogEntry, OutreachError,
    StorageAdapter,
};
use tokio::sync::OwnedMutexGuard;
use tracing::info;

use crate::warm::WarmSessions;

/// Owns conversation records and the per-contact lock that serializes every
/// mutation of one contact's conversation.
///
/// Public methods take the contact lock themselves. The `*_locked` helpers
/// expect the caller to hold it already (see [`ConversationRegistry::lock`]).
///
/// Saving an agent and binding to it also share a per-agent lock, always
/// taken after the contact lock, so a binding never lands on an agent that
/// was deactivated after it was checked.
pub struct ConversationRegistry {
    storage: Arc<dyn StorageAdapter>,
    message_log: Arc<dyn MessageLogAdapter>,
    bus: Arc<EventBus>,
    sessions: Arc<WarmSessions>,
    locks: KeyedMutex,
    agent_locks: KeyedMutex,
}

impl ConversationRegistry {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        message_log: Arc<dyn MessageLogAdapter>,
        bus: Arc<EventBus>,
        sessions: Arc<WarmSessions>,
    ) -> Self {
        Self {
            storage,
            message_log,
            bus,
            sessions,
            locks: KeyedMutex::new(),
            agent_locks: KeyedMutex::new(),
        }
    }

    /// Acquires the contact's lock.
    pub async fn lock(&self, contact_id: &str) -> OwnedMutexGuard<()> {
        self.locks.lock(contact_id).await
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn sessions(&self) -> &Arc<WarmSessions> {
        &self.sessions
    }

    pub async fn find_or_create(&self, contact_id: &str) -> Result<ConversationRecord, OutreachError> {
        validate_contact(contact_id)?;
        let _guard = self.lock(contact_id).await;
        self.find_or_create_locked(contact_id).await
    }

    /// Binds the contact's conversation to an active agent, replacing any
    /// previous binding.
    pub async fn bind_agent(
        &self,
        contact_id: &str,
        agent_id: &str,
    ) -> Result<ConversationRecord, OutreachError> {
        validate_contact(contact_id)?;
        let _guard = self.lock(contact_id).await;
        let _agent_guard = self.agent_locks.lock(agent_id).await;
        let agent = self
            .storage
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| OutreachError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        if !agent.is_active {
            return Err(OutreachError::AgentInactive {
                agent_id: agent_id.to_string(),
            });
        }

        let mut record = self.find_or_create_locked(contact_id).await?;
        let previous = record.bound_agent_id.replace(agent.id.clone());
        record.updated_at = Utc::now();
        self.storage.update_conversation(&record).await?;
        let dropped = self.sessions.invalidate_contact(contact_id);

        info!(
            contact_id,
            agent_id = %agent.id,
            previous = previous.as_deref().unwrap_or("none"),
            dropped_sessions = dropped,
            "agent bound to conversation"
        );
        self.bus.publish(BusEvent::ConversationUpdate {
            conversation: record.clone(),
        });
        Ok(record)
    }

    /// Marks the conversation started and remembers the last outbound text.
    pub async fn record_outbound(
        &self,
        contact_id: &str,
        text: &str,
    ) -> Result<ConversationRecord, OutreachError> {
        validate_contact(contact_id)?;
        let _guard = self.lock(contact_id).await;
        self.record_outbound_locked(contact_id, text).await
    }

    pub async fn get(&self, contact_id: &str) -> Result<Option<ConversationRecord>, OutreachError> {
        self.storage.get_conversation(contact_id).await
    }

    /// Conversations, most recently updated first.
    pub async fn list(&self, limit: i64) -> Result<Vec<ConversationRecord>, OutreachError> {
        self.storage.list_conversations(limit).await
    }

    /// The `limit` most recent log entries for the contact, oldest first.
    pub async fn history(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageLogEntry>, OutreachError> {
        self.message_log.recent(contact_id, limit).await
    }

    /// Creates or replaces an agent. An existing agent keeps its creation
    /// time, and its warm sessions are dropped so edits apply immediately.
    pub async fn save_agent(&self, mut agent: Agent) -> Result<Agent, OutreachError> {
        if agent.id.trim().is_empty() {
            return Err(OutreachError::InvalidInput("agent id must not be empty".into()));
        }
        if agent.system_instruction.trim().is_empty() {
            return Err(OutreachError::InvalidInput(
                "system_instruction must not be empty".into(),
            ));
        }

        let _agent_guard = self.agent_locks.lock(&agent.id).await;
        let now = Utc::now();
        if let Some(existing) = self.storage.get_agent(&agent.id).await? {
            agent.created_at = existing.created_at;
        } else {
            agent.created_at = now;
        }
        agent.updated_at = now;
        self.storage.upsert_agent(&agent).await?;
        let dropped = self.sessions.invalidate_agent(&agent.id);
        info!(agent_id = %agent.id, is_active = agent.is_active, dropped_sessions = dropped, "agent saved");
        Ok(agent)
    }

    pub async fn agents(&self) -> Result<Vec<Agent>, OutreachError> {
        self.storage.list_agents().await
    }

    pub(crate) async fn find_or_create_locked(
        &self,
        contact_id: &str,
    ) -> Result<ConversationRecord, OutreachError> {
        if let Some(existing) = self.storage.get_conversation(contact_id).await? {
            return Ok(existing);
        }

        let record = ConversationRecord::new(contact_id);
        if self.storage.insert_conversation_if_absent(&record).await? {
            info!(contact_id, "conversation created");
            self.bus.publish(BusEvent::NewConversation {
                conversation: record.clone(),
            });
            return Ok(record);
        }

        self.storage
            .get_conversation(contact_id)
            .await?
            .ok_or_else(|| OutreachError::ConversationNotFound {
                contact_id: contact_id.to_string(),
            })
    }

    pub(crate) async fn record_outbound_locked(
        &self,
        contact_id: &str,
        text: &str,
    ) -> Result<ConversationRecord, OutreachError> {
        let mut record = self.find_or_create_locked(contact_id).await?;
        record.has_started = true;
        record.last_outbound_text = Some(text.to_string());
        record.updated_at = Utc::now();
        self.storage.update_conversation(&record).await?;
        self.bus.publish(BusEvent::ConversationUpdate {
            conversation: record.clone(),
        });
        Ok(record)
    }

    pub(crate) async fn save_locked(&self, record: &ConversationRecord) -> Result<(), OutreachError> {
        self.storage.update_conversation(record).await
    }
}

pub(crate) fn validate_contact(contact_id: &str) -> Result<(), OutreachError> {
    if contact_id.trim().is_empty() {
        return Err(OutreachError::InvalidInput(
            "contact_id must not be empty".into(),
        ));
    }
    Ok(())
}
