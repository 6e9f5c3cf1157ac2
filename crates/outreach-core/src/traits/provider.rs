// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote batch-calling provider trait.

use async_trait::async_trait;

use crate::error::OutreachError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BatchCallRequest, BatchSubmission, ProviderSnapshot};

/// Adapter for the service that places outbound calls in batches.
///
/// Network and protocol failures are reported as
/// [`OutreachError::ProviderUnavailable`].
#[async_trait]
pub trait CallProvider: PluginAdapter {
    /// Submits a batch and returns the provider-assigned batch id.
    async fn start_batch_call(
        &self,
        request: &BatchCallRequest,
    ) -> Result<BatchSubmission, OutreachError>;

    /// Fetches the current overall and per-recipient status of a batch.
    async fn get_batch_status(&self, batch_id: &str) -> Result<ProviderSnapshot, OutreachError>;

    async fn cancel_batch(&self, batch_id: &str) -> Result<(), OutreachError>;

    /// Asks the provider to re-dial recipients whose calls did not complete.
    async fn retry_batch(&self, batch_id: &str) -> Result<BatchSubmission, OutreachError>;
}
