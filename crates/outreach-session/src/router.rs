// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message routing.
//!
//! Every inbound message is logged, even when no reply can be produced. A
//! reply is generated only for conversations bound to an active agent, from
//! the agent's instruction plus the most recent prior log entries. When a
//! transport is attached the router also delivers the reply and logs it once,
//! with the delivery outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use outreach_bus::BusEvent;
use outreach_config::model::SessionConfig;
use outreach_core::{
    Direction, ErrorKind, HistoryTurn, InboundOutcome, MessageLogAdapter, MessageLogEntry,
    MessageTransport, OutreachError, ReplyDelivery, ReplyGenerator, StorageAdapter,
};
use tracing::{debug, error, info, warn};

use crate::registry::{validate_contact, ConversationRegistry};

/// Key in `extra_state` holding the time of the last generated reply.
pub const LAST_RESPONSE_AT: &str = "lastResponseAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterSettings {
    /// Prior log entries replayed to the generator.
    pub history_window: usize,
    pub generation_timeout: Duration,
}

impl From<&SessionConfig> for RouterSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            history_window: config.history_window,
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }
}

pub struct SessionRouter {
    registry: Arc<ConversationRegistry>,
    storage: Arc<dyn StorageAdapter>,
    message_log: Arc<dyn MessageLogAdapter>,
    generator: Arc<dyn ReplyGenerator>,
    transport: Option<Arc<dyn MessageTransport>>,
    settings: RouterSettings,
}

impl SessionRouter {
    pub fn new(
        registry: Arc<ConversationRegistry>,
        storage: Arc<dyn StorageAdapter>,
        message_log: Arc<dyn MessageLogAdapter>,
        generator: Arc<dyn ReplyGenerator>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            registry,
            storage,
            message_log,
            generator,
            transport: None,
            settings,
        }
    }

    /// Delivers generated replies through `transport` before they are logged.
    pub fn with_transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub async fn handle_inbound(
        &self,
        contact_id: &str,
        text: &str,
    ) -> Result<InboundOutcome, OutreachError> {
        self.handle_inbound_with_id(contact_id, text, None).await
    }

    /// Routes one inbound message, recording the transport's message id on
    /// the logged entry.
    ///
    /// Routing failures that leave the message unanswered (`NoAgentBound`,
    /// `AgentNotFound`, `AgentInactive`, `GenerationFailed`) are reported in
    /// the outcome. Storage failures are returned as errors.
    pub async fn handle_inbound_with_id(
        &self,
        contact_id: &str,
        text: &str,
        external_message_id: Option<String>,
    ) -> Result<InboundOutcome, OutreachError> {
        validate_contact(contact_id)?;
        let _guard = self.registry.lock(contact_id).await;
        let bus = self.registry.bus();

        let mut conversation = self.registry.find_or_create_locked(contact_id).await?;
        let prior = self
            .message_log
            .recent(contact_id, self.settings.history_window)
            .await?;

        let inbound = MessageLogEntry::new(contact_id, Direction::Received, text)
            .with_external_id(external_message_id);
        self.message_log.append(&inbound).await?;
        bus.publish(BusEvent::NewMessage { entry: inbound });

        if !conversation.has_started {
            conversation.has_started = true;
            conversation.updated_at = Utc::now();
            self.registry.save_locked(&conversation).await?;
            bus.publish(BusEvent::ConversationUpdate {
                conversation: conversation.clone(),
            });
        }

        let Some(agent_id) = conversation.bound_agent_id.clone() else {
            info!(contact_id, "inbound message without bound agent");
            return Ok(InboundOutcome::declined(ErrorKind::NoAgentBound));
        };
        let agent = match self.storage.get_agent(&agent_id).await? {
            Some(agent) if agent.is_active => agent,
            Some(_) => {
                info!(contact_id, agent_id = %agent_id, "bound agent is inactive");
                return Ok(InboundOutcome::declined(ErrorKind::AgentInactive));
            }
            None => {
                warn!(contact_id, agent_id = %agent_id, "bound agent no longer exists");
                return Ok(InboundOutcome::declined(ErrorKind::AgentNotFound));
            }
        };

        let session = self.registry.sessions().get_or_warm(&agent, contact_id);
        let history: Vec<HistoryTurn> = prior.iter().map(HistoryTurn::from).collect();
        debug!(
            contact_id,
            agent_id = %agent.id,
            history_len = history.len(),
            "generating reply"
        );

        let generated = tokio::time::timeout(
            self.settings.generation_timeout,
            self.generator
                .generate_reply(&session.system_instruction, &history, text),
        )
        .await;
        let reply = match generated {
            Ok(Ok(reply)) if !reply.trim().is_empty() => reply,
            Ok(Ok(_)) => {
                warn!(contact_id, agent_id = %agent.id, "generator returned an empty reply");
                return Ok(InboundOutcome::declined(ErrorKind::GenerationFailed));
            }
            Ok(Err(e)) => {
                warn!(contact_id, agent_id = %agent.id, error = %e, "reply generation failed");
                return Ok(InboundOutcome::declined(ErrorKind::GenerationFailed));
            }
            Err(_) => {
                warn!(
                    contact_id,
                    agent_id = %agent.id,
                    timeout_secs = self.settings.generation_timeout.as_secs(),
                    "reply generation timed out"
                );
                return Ok(InboundOutcome::declined(ErrorKind::GenerationFailed));
            }
        };

        let delivery = self.deliver(contact_id, &reply).await;
        let external_id = match &delivery {
            ReplyDelivery::Delivered {
                external_message_id,
            } => Some(external_message_id.clone()),
            _ => None,
        };
        let outbound = MessageLogEntry::new(contact_id, Direction::Sent, reply.as_str())
            .with_external_id(external_id)
            .with_metadata(serde_json::json!({ "agent_id": agent.id, "delivery": delivery }));
        self.message_log.append(&outbound).await?;

        let now = Utc::now();
        conversation.has_started = true;
        if !matches!(delivery, ReplyDelivery::Failed { .. }) {
            conversation.last_outbound_text = Some(reply.clone());
        }
        conversation
            .extra_state
            .insert(LAST_RESPONSE_AT.to_string(), now.to_rfc3339().into());
        conversation.updated_at = now;
        self.registry.save_locked(&conversation).await?;

        bus.publish(BusEvent::NewMessage { entry: outbound });
        bus.publish(BusEvent::ConversationUpdate {
            conversation: conversation.clone(),
        });
        info!(contact_id, agent_id = %agent.id, delivery = ?delivery, "reply generated");
        Ok(InboundOutcome::reply(reply, delivery))
    }

    async fn deliver(&self, contact_id: &str, reply: &str) -> ReplyDelivery {
        let Some(transport) = &self.transport else {
            return ReplyDelivery::Pending;
        };
        match transport.send(contact_id, reply).await {
            Ok(external_message_id) => ReplyDelivery::Delivered {
                external_message_id,
            },
            Err(e) => {
                error!(contact_id, error = %e, "reply delivery failed");
                ReplyDelivery::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Drops the contact's warm sessions. The next inbound message starts a
    /// fresh one. Returns how many were dropped.
    pub fn reset_session(&self, contact_id: &str) -> usize {
        let dropped = self.registry.sessions().invalidate_contact(contact_id);
        info!(contact_id, dropped, "warm session reset");
        dropped
    }
}
