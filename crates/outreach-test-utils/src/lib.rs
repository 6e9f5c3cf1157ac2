// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Outreach integration tests.
//!
//! Provides mock collaborators and a harness wiring them to temp SQLite
//! storage, so campaign and conversation flows run without external services.
//!
//! # Components
//!
//! - [`MockCallProvider`] - scripted batch-calling provider
//! - [`MockGenerator`] - queued replies with failure injection
//! - [`MockTransport`] - captures outbound messages
//! - [`RecordingHook`] - records follow-up invocations
//! - [`TestHarness`] - the full stack over temp databases

pub mod harness;
pub mod mock_generator;
pub mod mock_provider;
pub mod mock_transport;
pub mod recording_hook;

pub use harness::TestHarness;
pub use mock_generator::{GenerateCall, MockGenerator};
pub use mock_provider::MockCallProvider;
pub use mock_transport::MockTransport;
pub use recording_hook::RecordingHook;

use outreach_core::{CallStatus, ProviderSnapshot, RecipientCallState};

/// Builds a snapshot for `batch_id` with `count` recipients per status.
///
/// Contact ids are sequential (`+15550000`, `+15550001`, ...) across the
/// whole snapshot, so two calls with the same layout produce the same ids.
pub fn snapshot(
    batch_id: &str,
    status: CallStatus,
    layout: &[(CallStatus, usize)],
) -> ProviderSnapshot {
    let mut recipients = Vec::new();
    for (recipient_status, count) in layout {
        for _ in 0..*count {
            recipients.push(RecipientCallState {
                contact_id: format!("+1555{:04}", recipients.len()),
                status: *recipient_status,
            });
        }
    }
    ProviderSnapshot {
        batch_id: batch_id.to_string(),
        status,
        recipients,
    }
}
