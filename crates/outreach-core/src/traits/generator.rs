// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generative reply trait.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::traits::adapter::PluginAdapter;
use crate::types::HistoryTurn;

/// Adapter for the model that produces agent replies.
#[async_trait]
pub trait ReplyGenerator: PluginAdapter {
    /// Produces a reply to `message` given the agent's instruction and the
    /// prior turns, oldest first.
    async fn generate_reply(
        &self,
        system_instruction: &str,
        history: &[HistoryTurn],
        message: &str,
    ) -> Result<String, OutreachError>;
}
