// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log trait.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::traits::adapter::PluginAdapter;
use crate::types::MessageLogEntry;

/// Adapter for the per-contact message log, the only source of
/// conversational history.
#[async_trait]
pub trait MessageLogAdapter: PluginAdapter {
    async fn initialize(&self) -> Result<(), OutreachError>;

    async fn close(&self) -> Result<(), OutreachError>;

    /// Appends an entry. Entries are never modified afterwards.
    async fn append(&self, entry: &MessageLogEntry) -> Result<(), OutreachError>;

    /// Returns the `limit` most recent entries for the contact, oldest first.
    /// Ties on timestamp are broken by insertion order.
    async fn recent(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageLogEntry>, OutreachError>;
}
