// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up hook that records its invocations.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use outreach_campaign::FollowUpHook;
use outreach_core::{OutreachError, RecipientCallState};

#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(String, RecipientCallState)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow-ups for `contact_id` fail from now on (still recorded).
    pub async fn fail_for(&self, contact_id: &str) {
        self.failing.lock().await.insert(contact_id.to_string());
    }

    pub async fn calls(&self) -> Vec<(String, RecipientCallState)> {
        self.calls.lock().await.clone()
    }

    /// How many times the hook ran for `(batch_id, contact_id)`.
    pub async fn count_for(&self, batch_id: &str, contact_id: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(batch, recipient)| batch == batch_id && recipient.contact_id == contact_id)
            .count()
    }
}

#[async_trait]
impl FollowUpHook for RecordingHook {
    async fn on_recipient_terminal(
        &self,
        batch_id: &str,
        recipient: &RecipientCallState,
    ) -> Result<(), OutreachError> {
        self.calls
            .lock()
            .await
            .push((batch_id.to_string(), recipient.clone()));
        if self.failing.lock().await.contains(&recipient.contact_id) {
            return Err(OutreachError::Transport {
                message: "recording hook configured to fail".into(),
                source: None,
            });
        }
        Ok(())
    }
}
