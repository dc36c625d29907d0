//! # WealthDesk Store
//!
//! The persistent record store: clients, accounts, documents, conversation
//! history, knowledge entries, provider task audit rows, and scanner
//! alerts, all keyed by client id.
//!
//! One SQLite database file; schema created by idempotent migrations at
//! startup. Every write is a self-contained upsert scoped to a single
//! entity id, so concurrent provider units never contend on a row.

pub mod seed;
pub mod sqlite;

pub use sqlite::SqliteStore;
