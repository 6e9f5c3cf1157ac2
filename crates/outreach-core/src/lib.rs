// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Outreach campaign backend.
//!
//! This crate provides the domain types, the error taxonomy and the
//! collaborator traits shared across the workspace. Concrete storage,
//! provider and transport crates implement the traits defined here.

pub mod error;
pub mod sync;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, OutreachError};
pub use sync::KeyedMutex;
pub use types::{
    AdapterType, Agent, BatchCallRecord, BatchCallRequest, BatchStats, BatchStatus,
    BatchSubmission, CallStatus, ChatRole, ConversationLifecycle, ConversationRecord, Direction,
    FollowUpRecord, FollowUpState, HealthStatus, HistoryTurn, InboundOutcome, MessageLogEntry,
    ProviderSnapshot, Recipient, RecipientCallState, ReplyDelivery,
};

pub use traits::{
    CallProvider, MessageLogAdapter, MessageTransport, PluginAdapter, ReplyGenerator,
    StorageAdapter,
};
