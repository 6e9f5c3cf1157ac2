// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, campaign, session and gateway crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    MessageLog,
    CallProvider,
    Generator,
    Transport,
}

// --- Conversations ---

/// Soft lifecycle of a conversation row. Rows are never hard-deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationLifecycle {
    #[default]
    Active,
    Archived,
}

/// Authoritative per-contact conversation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub contact_id: String,
    pub last_outbound_text: Option<String>,
    pub has_started: bool,
    pub bound_agent_id: Option<String>,
    /// Session bookkeeping (e.g. `lastResponseAt`). Always a JSON object.
    pub extra_state: serde_json::Map<String, serde_json::Value>,
    pub lifecycle: ConversationLifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// A fresh, unbound conversation for `contact_id`.
    pub fn new(contact_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            contact_id: contact_id.into(),
            last_outbound_text: None,
            has_started: false,
            bound_agent_id: None,
            extra_state: serde_json::Map::new(),
            lifecycle: ConversationLifecycle::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Direction of a logged message relative to this service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

/// One immutable entry in the per-contact message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub id: String,
    pub contact_id: String,
    pub direction: Direction,
    pub content: String,
    pub external_message_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl MessageLogEntry {
    /// Builds a new entry stamped with the current time.
    pub fn new(contact_id: impl Into<String>, direction: Direction, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact_id.into(),
            direction,
            content: content.into(),
            external_message_id: None,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_message_id = external_id;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Role of a history turn as seen by the generative capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl From<Direction> for ChatRole {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Sent => ChatRole::Assistant,
            Direction::Received => ChatRole::User,
        }
    }
}

/// A single turn of replayed conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

impl From<&MessageLogEntry> for HistoryTurn {
    fn from(entry: &MessageLogEntry) -> Self {
        Self {
            role: entry.direction.into(),
            content: entry.content.clone(),
        }
    }
}

// --- Agents ---

/// AI agent configuration owned by an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub system_instruction: String,
    pub language: String,
    pub is_active: bool,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Batches ---

/// Lifecycle status of a group's batch-call record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    None,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl BatchStatus {
    /// Terminal statuses admit no further automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

/// Status reported by the call provider, both per recipient and for the
/// batch as a whole.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl CallStatus {
    pub fn is_terminal(self) -> bool {
        self.as_terminal().is_some()
    }

    /// The batch status this provider status settles into, if terminal.
    pub fn as_terminal(self) -> Option<BatchStatus> {
        match self {
            CallStatus::Completed => Some(BatchStatus::Completed),
            CallStatus::Failed => Some(BatchStatus::Failed),
            CallStatus::Cancelled => Some(BatchStatus::Cancelled),
            CallStatus::Pending | CallStatus::InProgress => None,
        }
    }
}

/// Per-recipient call state derived from a provider snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientCallState {
    pub contact_id: String,
    pub status: CallStatus,
}

/// A validated view of the provider's report for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub batch_id: String,
    pub status: CallStatus,
    pub recipients: Vec<RecipientCallState>,
}

/// Authoritative per-group batch-call record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCallRecord {
    pub group_id: String,
    pub batch_id: String,
    pub status: BatchStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_recipients: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub raw_provider_snapshot: Option<ProviderSnapshot>,
    pub metadata: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated statistics for a group's current batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub has_been_called: bool,
    pub status: BatchStatus,
    pub total_recipients: u32,
    pub completed_count: u32,
    pub failed_count: u32,
    pub success_rate: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `in_progress` for longer than the polling ceiling.
    pub stale: bool,
}

impl BatchStats {
    /// Statistics for a group that has never been called.
    pub fn never_called() -> Self {
        Self {
            has_been_called: false,
            status: BatchStatus::None,
            total_recipients: 0,
            completed_count: 0,
            failed_count: 0,
            success_rate: 0,
            started_at: None,
            completed_at: None,
            stale: false,
        }
    }
}

/// `round(completed / total * 100)`, or 0 for an empty batch.
pub fn success_rate(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(completed) / f64::from(total) * 100.0).round() as u32
}

/// A single recipient of an outbound batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub contact_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to place a batch of outbound calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCallRequest {
    pub group_id: String,
    pub call_name: String,
    pub recipients: Vec<Recipient>,
    pub agent_phone_id: String,
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Provider acknowledgement of a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmission {
    pub batch_id: String,
    pub recipients_count: u32,
}

// --- Follow-ups ---

/// Outcome state of a one-shot follow-up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpState {
    Pending,
    Delivered,
    Failed,
}

/// Ledger row for the one-shot side effect of a `(batch_id, contact_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpRecord {
    pub batch_id: String,
    pub contact_id: String,
    pub recipient_status: CallStatus,
    pub state: FollowUpState,
    pub error: Option<String>,
    pub claimed_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

// --- Routing ---

/// What happened to a generated reply on its way to the contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReplyDelivery {
    /// No transport was attached; the caller delivers the reply.
    Pending,
    Delivered { external_message_id: String },
    Failed { error: String },
}

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundOutcome {
    pub should_respond: bool,
    pub reply_text: Option<String>,
    pub error_kind: Option<crate::error::ErrorKind>,
    /// Set whenever a reply was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<ReplyDelivery>,
}

impl InboundOutcome {
    pub fn reply(text: impl Into<String>, delivery: ReplyDelivery) -> Self {
        Self {
            should_respond: true,
            reply_text: Some(text.into()),
            error_kind: None,
            delivery: Some(delivery),
        }
    }

    pub fn declined(kind: crate::error::ErrorKind) -> Self {
        Self {
            should_respond: false,
            reply_text: None,
            error_kind: Some(kind),
            delivery: None,
        }
    }
}
