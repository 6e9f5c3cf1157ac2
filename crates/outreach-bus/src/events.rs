// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event payloads carried by the bus.

use outreach_core::{BatchStats, ConversationRecord, MessageLogEntry};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Named channel of related events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    NewMessage,
    ConversationUpdate,
    NewConversation,
    BatchUpdate,
}

/// A single published event. Serialized with a `type` tag matching the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A message log entry was appended.
    NewMessage { entry: MessageLogEntry },
    /// A conversation record changed (binding, outbound text, state).
    ConversationUpdate { conversation: ConversationRecord },
    /// A conversation record was created.
    NewConversation { conversation: ConversationRecord },
    /// A batch was started, reconciled or cancelled.
    BatchUpdate {
        group_id: String,
        batch_id: String,
        stats: BatchStats,
    },
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::NewMessage { .. } => Topic::NewMessage,
            BusEvent::ConversationUpdate { .. } => Topic::ConversationUpdate,
            BusEvent::NewConversation { .. } => Topic::NewConversation,
            BusEvent::BatchUpdate { .. } => Topic::BatchUpdate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_core::{Direction, MessageLogEntry};
    use std::str::FromStr;

    #[test]
    fn topic_names_are_snake_case() {
        assert_eq!(Topic::NewMessage.to_string(), "new_message");
        assert_eq!(Topic::from_str("batch_update").unwrap(), Topic::BatchUpdate);
        assert!(Topic::from_str("BatchUpdate").is_err());
    }

    #[test]
    fn event_tag_matches_topic() {
        let event = BusEvent::NewMessage {
            entry: MessageLogEntry::new("+15550001", Direction::Received, "hola"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.topic().to_string());
        assert_eq!(json["entry"]["content"], "hola");
    }
}
