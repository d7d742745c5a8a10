// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema DDL and version enforcement.
//!
//! The schema version is kept in SQLite's `user_version` header field. A
//! fresh file (version 0) gets the full DDL and is stamped with
//! [`SCHEMA_VERSION`]; any other stored value is rejected. There is no
//! automatic migration.

use cryptosafe_core::SafeError;
use rusqlite::Transaction;

/// The only schema version this build understands.
pub const SCHEMA_VERSION: i64 = 2;

/// Full DDL for a fresh database.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vault_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    username TEXT,
    encrypted_password BLOB NOT NULL,
    url TEXT,
    notes BLOB,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    tags TEXT
);

CREATE INDEX IF NOT EXISTS idx_vault_title ON vault_entries(title);
CREATE INDEX IF NOT EXISTS idx_vault_updated_at ON vault_entries(updated_at);
CREATE INDEX IF NOT EXISTS idx_vault_username ON vault_entries(username);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    entry_id INTEGER,
    details TEXT,
    signature BLOB
);

CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);

CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    setting_key TEXT NOT NULL UNIQUE,
    setting_value TEXT,
    encrypted INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_settings_key ON settings(setting_key);

CREATE TABLE IF NOT EXISTS key_store (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key_type TEXT NOT NULL UNIQUE,
    salt BLOB NOT NULL,
    hash BLOB NOT NULL,
    params TEXT
);
"#;

/// Outcome of a schema check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCheck {
    /// The file was empty; DDL applied and version stamped.
    Created,
    /// The stored version matches.
    Current,
    /// The stored version is something else.
    Incompatible { found: i64 },
}

impl SchemaCheck {
    pub fn into_result(self) -> Result<(), SafeError> {
        match self {
            SchemaCheck::Created | SchemaCheck::Current => Ok(()),
            SchemaCheck::Incompatible { found } => Err(SafeError::SchemaIncompatible {
                found,
                expected: SCHEMA_VERSION,
            }),
        }
    }
}

/// Read the stored version and create the schema if the file is fresh.
pub fn ensure_schema(tx: &Transaction<'_>) -> Result<SchemaCheck, rusqlite::Error> {
    let current: i64 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current == 0 {
        tx.execute_batch(SCHEMA)?;
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        return Ok(SchemaCheck::Created);
    }

    if current == SCHEMA_VERSION {
        Ok(SchemaCheck::Current)
    } else {
        Ok(SchemaCheck::Incompatible { found: current })
    }
}
