// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the CryptoSafe vault.
//!
//! Provides a connection pool over `tokio-rusqlite`, transactional sessions,
//! and schema version enforcement. Repositories in other crates issue their
//! own SQL through [`Database::session`].

pub mod database;
pub mod schema;

pub use database::{Database, PooledConnection, DEFAULT_POOL_SIZE};
pub use schema::{SchemaCheck, SCHEMA_VERSION};
