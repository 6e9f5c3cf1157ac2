// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Outreach campaign backend.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across all Outreach traits and core operations.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A batch is already running for the group.
    #[error("a batch is already in progress for group {group_id}")]
    AlreadyInProgress { group_id: String },

    /// The group has no batch lifecycle to act on.
    #[error("no batch has been started for group {group_id}")]
    NoBatchStarted { group_id: String },

    /// The referenced agent does not exist.
    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    /// The referenced agent exists but is not active.
    #[error("agent is inactive: {agent_id}")]
    AgentInactive { agent_id: String },

    /// The conversation has no agent to route to.
    #[error("no agent bound to conversation {contact_id}")]
    NoAgentBound { contact_id: String },

    /// The conversation does not exist.
    #[error("conversation not found: {contact_id}")]
    ConversationNotFound { contact_id: String },

    /// The generative capability failed to produce a reply.
    #[error("reply generation failed: {message}")]
    GenerationFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote call provider could not be reached or returned an error.
    #[error("call provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The outbound messaging transport failed.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller supplied an invalid argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OutreachError {
    /// Wraps any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OutreachError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns the taxonomy kind for errors that are part of the public contract.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            OutreachError::AlreadyInProgress { .. } => Some(ErrorKind::AlreadyInProgress),
            OutreachError::NoBatchStarted { .. } => Some(ErrorKind::NoBatchStarted),
            OutreachError::AgentNotFound { .. } => Some(ErrorKind::AgentNotFound),
            OutreachError::AgentInactive { .. } => Some(ErrorKind::AgentInactive),
            OutreachError::NoAgentBound { .. } => Some(ErrorKind::NoAgentBound),
            OutreachError::GenerationFailed { .. } => Some(ErrorKind::GenerationFailed),
            OutreachError::ProviderUnavailable { .. } => Some(ErrorKind::ProviderUnavailable),
            _ => None,
        }
    }

    /// Whether the failure should be retried on the next scheduled cycle
    /// rather than surfaced as a structural error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OutreachError::ProviderUnavailable { .. }
                | OutreachError::GenerationFailed { .. }
                | OutreachError::Transport { .. }
                | OutreachError::Timeout { .. }
        )
    }
}

/// Stable names for the error conditions exposed to callers.
///
/// `StaleOrAbandonedBatch` is never carried by an [`OutreachError`]; it is a
/// queryable condition reported through batch statistics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorKind {
    AlreadyInProgress,
    NoBatchStarted,
    AgentNotFound,
    AgentInactive,
    NoAgentBound,
    GenerationFailed,
    ProviderUnavailable,
    StaleOrAbandonedBatch,
}
