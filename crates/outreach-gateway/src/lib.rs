// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Outreach.
//!
//! Exposes the campaign and conversation operations under `/v1`, a
//! Server-Sent Events stream of bus events, and the WhatsApp Cloud webhook.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;
pub mod webhook;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, HealthState, build_router, start_server};
pub use webhook::WebhookConfig;
