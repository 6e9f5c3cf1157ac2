// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator- and campaign-initiated outbound messages.

use std::sync::Arc;

use async_trait::async_trait;
use outreach_bus::BusEvent;
use outreach_campaign::FollowUpHook;
use outreach_core::{
    Direction, MessageLogAdapter, MessageLogEntry, MessageTransport, OutreachError,
    RecipientCallState,
};
use tracing::info;

use crate::registry::{validate_contact, ConversationRegistry};

/// Sends a message through the transport and records it like a reply.
pub struct OutboundSender {
    registry: Arc<ConversationRegistry>,
    message_log: Arc<dyn MessageLogAdapter>,
    transport: Arc<dyn MessageTransport>,
}

impl OutboundSender {
    pub fn new(
        registry: Arc<ConversationRegistry>,
        message_log: Arc<dyn MessageLogAdapter>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            registry,
            message_log,
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<dyn MessageTransport> {
        &self.transport
    }

    /// Delivers `text` to the contact. Nothing is logged when the transport
    /// rejects the message.
    pub async fn send(&self, contact_id: &str, text: &str) -> Result<MessageLogEntry, OutreachError> {
        validate_contact(contact_id)?;
        if text.trim().is_empty() {
            return Err(OutreachError::InvalidInput("message text must not be empty".into()));
        }

        let _guard = self.registry.lock(contact_id).await;
        let external_id = self.transport.send(contact_id, text).await?;

        let entry = MessageLogEntry::new(contact_id, Direction::Sent, text)
            .with_external_id(Some(external_id));
        self.message_log.append(&entry).await?;
        self.registry.record_outbound_locked(contact_id, text).await?;
        self.registry.bus().publish(BusEvent::NewMessage {
            entry: entry.clone(),
        });
        info!(contact_id, external_id = ?entry.external_message_id, "outbound message sent");
        Ok(entry)
    }
}

/// Follow-up hook that messages the recipient once their call has ended.
pub struct OutboundFollowUp {
    sender: Arc<OutboundSender>,
    text: String,
}

impl OutboundFollowUp {
    pub fn new(sender: Arc<OutboundSender>, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }
}

#[async_trait]
impl FollowUpHook for OutboundFollowUp {
    async fn on_recipient_terminal(
        &self,
        batch_id: &str,
        recipient: &RecipientCallState,
    ) -> Result<(), OutreachError> {
        let entry = self.sender.send(&recipient.contact_id, &self.text).await?;
        info!(
            batch_id,
            contact_id = %recipient.contact_id,
            call_status = %recipient.status,
            message_id = %entry.id,
            "follow-up delivered"
        );
        Ok(())
    }
}
