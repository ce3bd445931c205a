//! Action and mention ledger for murmur.
//!
//! [`SqliteLedger`] implements `murmur_core::Ledger` over a pooled SQLite
//! database. It is append-only for actions and idempotent for mentions.

pub mod sqlite;

pub use sqlite::SqliteLedger;
