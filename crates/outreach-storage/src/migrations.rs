// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! The relational store and the message log live in separate database files
//! and carry separate migration sets.

mod relational {
    use refinery::embed_migrations;
    embed_migrations!("migrations/relational");
}

mod message_log {
    use refinery::embed_migrations;
    embed_migrations!("migrations/message_log");
}

/// Which migration set a database file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Conversations, agents, batch records and the follow-up ledger.
    Relational,
    /// The append-only message log.
    MessageLog,
}

/// Run all pending migrations for `schema` against the given connection.
pub fn run(conn: &mut rusqlite::Connection, schema: Schema) -> Result<(), refinery::Error> {
    let report = match schema {
        Schema::Relational => relational::migrations::runner().run(conn)?,
        Schema::MessageLog => message_log::migrations::runner().run(conn)?,
    };
    for migration in report.applied_migrations() {
        tracing::info!(?schema, migration = %migration, "applied migration");
    }
    Ok(())
}
