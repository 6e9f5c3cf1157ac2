// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation handling for Outreach: the per-contact registry, inbound
//! routing to bound agents, and outbound delivery.

pub mod outbound;
pub mod registry;
pub mod router;
pub mod warm;

pub use outbound::{OutboundFollowUp, OutboundSender};
pub use registry::ConversationRegistry;
pub use router::{RouterSettings, SessionRouter};
pub use warm::{WarmSession, WarmSessions};
