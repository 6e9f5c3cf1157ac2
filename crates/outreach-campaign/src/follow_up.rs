// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The one-shot side effect fired when a recipient's call finishes.

use async_trait::async_trait;
use outreach_core::{OutreachError, RecipientCallState};

/// Action run exactly once per `(batch_id, contact_id)` after the
/// recipient's call reaches a terminal status.
///
/// The monitor records the returned outcome in the follow-up ledger; an
/// error marks the ledger row failed and is not retried automatically.
#[async_trait]
pub trait FollowUpHook: Send + Sync + 'static {
    async fn on_recipient_terminal(
        &self,
        batch_id: &str,
        recipient: &RecipientCallState,
    ) -> Result<(), OutreachError>;
}

/// Hook that does nothing. Used when no follow-up channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFollowUp;

#[async_trait]
impl FollowUpHook for NoopFollowUp {
    async fn on_recipient_terminal(
        &self,
        _batch_id: &str,
        _recipient: &RecipientCallState,
    ) -> Result<(), OutreachError> {
        Ok(())
    }
}
