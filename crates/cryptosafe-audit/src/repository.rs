// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log persistence.
//!
//! Rows are only ever inserted. Nothing in this crate updates or deletes
//! them; `signature` is always written as NULL.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use cryptosafe_core::SafeError;
use cryptosafe_storage::Database;
use rusqlite::params;
use serde::Serialize;
use tracing::debug;

/// Number of rows [`AuditRepository::last`] returns when no limit is given.
pub const DEFAULT_LIMIT: usize = 50;

/// A single audit row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub action: String,
    pub timestamp: String,
    pub entry_id: Option<i64>,
    pub details: serde_json::Value,
}

pub struct AuditRepository {
    db: Arc<Database>,
}

impl AuditRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one row and return its id.
    pub async fn write(
        &self,
        action: &str,
        details: &serde_json::Value,
        entry_id: Option<i64>,
    ) -> Result<i64, SafeError> {
        if action.trim().is_empty() {
            return Err(SafeError::invalid("audit action must not be empty"));
        }
        let action_owned = action.to_string();
        let details = details.to_string();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let id = self
            .db
            .session(move |tx| {
                tx.execute(
                    "INSERT INTO audit_log (action, timestamp, entry_id, details, signature) \
                     VALUES (?1, ?2, ?3, ?4, NULL)",
                    params![action_owned, timestamp, entry_id, details],
                )?;
                Ok(tx.last_insert_rowid())
            })
            .await?;

        debug!(id, action, "audit record written");
        Ok(id)
    }

    /// The newest `limit` rows, newest first.
    pub async fn last(&self, limit: usize) -> Result<Vec<AuditRecord>, SafeError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .session(move |tx| {
                let mut stmt = tx.prepare(
                    "SELECT id, action, timestamp, entry_id, details FROM audit_log \
                     ORDER BY id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    let details: Option<String> = row.get(4)?;
                    Ok(AuditRecord {
                        id: row.get(0)?,
                        action: row.get(1)?,
                        timestamp: row.get(2)?,
                        entry_id: row.get(3)?,
                        details: parse_details(details.as_deref()),
                    })
                })?;
                let records = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
    }
}

fn parse_details(raw: Option<&str>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
    }
}
