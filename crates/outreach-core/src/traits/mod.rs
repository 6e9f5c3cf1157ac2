// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! All collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generator;
pub mod message_log;
pub mod provider;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use generator::ReplyGenerator;
pub use message_log::MessageLogAdapter;
pub use provider::CallProvider;
pub use storage::StorageAdapter;
pub use transport::MessageTransport;
