// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Outreach campaign backend.
//!
//! Two database files are managed: the relational store (conversations,
//! agents, batch records, follow-up ledger) behind [`SqliteStorage`], and the
//! append-only message log behind [`SqliteMessageLog`]. Each uses WAL mode,
//! embedded refinery migrations, and a single writer thread via
//! `tokio-rusqlite`.

pub mod adapter;
pub mod database;
pub mod message_log;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use message_log::SqliteMessageLog;
pub use migrations::Schema;
