// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process event fan-out.
//!
//! Components publish [`BusEvent`]s on named [`Topic`]s; live monitoring
//! surfaces (SSE, tests, background listeners) subscribe either pull-style
//! with [`EventBus::subscribe`] or with a handler via
//! [`EventBus::subscribe_with`]. Nothing is persisted.

pub mod bus;
pub mod events;

pub use bus::{EventBus, Subscription, SubscriptionHandle};
pub use events::{BusEvent, Topic};
