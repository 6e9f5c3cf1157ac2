// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging transport trait.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::traits::adapter::PluginAdapter;

/// Adapter that delivers text messages to a contact.
#[async_trait]
pub trait MessageTransport: PluginAdapter {
    /// Sends `text` and returns the transport's message id.
    async fn send(&self, contact_id: &str, text: &str) -> Result<String, OutreachError>;
}
