// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault entry repository.
//!
//! Passwords and notes cross this boundary as plaintext and are stored only
//! as ciphertext produced by the injected [`EncryptionService`]. The key is
//! fetched from the [`KeyProvider`] per call and dropped (zeroed) before the
//! call returns.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use cryptosafe_bus::{DeliveryMode, EventBus, VaultEvent};
use cryptosafe_core::{EncryptionService, KeyProvider, SafeError, SecureBuffer};
use cryptosafe_storage::Database;
use rusqlite::{params, OptionalExtension};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Fields supplied when adding or replacing an entry.
#[derive(Debug)]
pub struct EntryInput {
    pub title: String,
    pub username: String,
    pub password: SecretString,
    pub url: String,
    pub notes: SecretString,
    pub tags: Vec<String>,
}

impl EntryInput {
    pub fn new(title: impl Into<String>, password: SecretString) -> Self {
        Self {
            title: title.into(),
            username: String::new(),
            password,
            url: String::new(),
            notes: SecretString::from(String::new()),
            tags: Vec::new(),
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn notes(mut self, notes: SecretString) -> Self {
        self.notes = notes;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// List view of an entry. Carries no secret fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    pub id: i64,
    pub title: String,
    pub username: String,
    pub url: String,
    pub tags: Vec<String>,
    pub updated_at: String,
}

/// Detail view with decrypted password and notes.
#[derive(Debug)]
pub struct EntryDetail {
    pub id: i64,
    pub title: String,
    pub username: String,
    pub password: SecretString,
    pub url: String,
    pub notes: SecretString,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Ciphertext ready for the `vault_entries` row.
struct SealedFields {
    password: Vec<u8>,
    notes: Option<Vec<u8>>,
}

type EncryptedRow = (
    i64,
    String,
    Option<String>,
    Vec<u8>,
    Option<String>,
    Option<Vec<u8>>,
    Option<String>,
    String,
    String,
);

pub struct VaultRepository {
    db: Arc<Database>,
    cipher: Arc<dyn EncryptionService>,
    keys: Arc<dyn KeyProvider>,
    bus: Option<Arc<EventBus>>,
}

impl VaultRepository {
    pub fn new(
        db: Arc<Database>,
        cipher: Arc<dyn EncryptionService>,
        keys: Arc<dyn KeyProvider>,
    ) -> Self {
        Self {
            db,
            cipher,
            keys,
            bus: None,
        }
    }

    /// Publish `EntryAdded`/`EntryUpdated`/`EntryDeleted` on `bus` after each
    /// committed mutation.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Encrypt and insert a new entry, returning its id.
    pub async fn add(&self, input: EntryInput) -> Result<i64, SafeError> {
        validate_title(&input.title)?;
        let sealed = self.seal(&input)?;
        let now = now_utc();

        let title = input.title.clone();
        let username = input.username;
        let url = input.url;
        let tags = join_tags(&input.tags);
        let id = self
            .db
            .session(move |tx| {
                tx.execute(
                    "INSERT INTO vault_entries
                        (title, username, encrypted_password, url, notes, created_at, updated_at, tags)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)",
                    params![title, username, sealed.password, url, sealed.notes, now, tags],
                )?;
                Ok(tx.last_insert_rowid())
            })
            .await?;

        debug!(entry_id = id, "vault entry added");
        self.publish(VaultEvent::EntryAdded {
            entry_id: id,
            title: input.title,
        })
        .await?;
        Ok(id)
    }

    /// All entries, most recently updated first.
    pub async fn list(&self) -> Result<Vec<EntrySummary>, SafeError> {
        self.db
            .session(|tx| {
                let mut stmt = tx.prepare(
                    "SELECT id, title, username, url, tags, updated_at
                     FROM vault_entries
                     ORDER BY updated_at DESC, id DESC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(EntrySummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        username: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        tags: split_tags(row.get::<_, Option<String>>(4)?.as_deref()),
                        updated_at: row.get(5)?,
                    })
                })?;
                let entries = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
    }

    /// Fetch and decrypt a single entry.
    pub async fn get_by_id(&self, entry_id: i64) -> Result<EntryDetail, SafeError> {
        let row: Option<EncryptedRow> = self
            .db
            .session(move |tx| {
                tx.query_row(
                    "SELECT id, title, username, encrypted_password, url, notes, tags,
                            created_at, updated_at
                     FROM vault_entries WHERE id = ?1",
                    params![entry_id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                        ))
                    },
                )
                .optional()
            })
            .await?;

        let (id, title, username, password, url, notes, tags, created_at, updated_at) =
            row.ok_or_else(|| SafeError::not_found(format!("vault entry {entry_id}")))?;

        let key = self.keys.master_key()?;
        let password = self.open(&password, &key)?;
        let notes = match notes {
            Some(ciphertext) => self.open(&ciphertext, &key)?,
            None => SecretString::from(String::new()),
        };

        Ok(EntryDetail {
            id,
            title,
            username: username.unwrap_or_default(),
            password,
            url: url.unwrap_or_default(),
            notes,
            tags: split_tags(tags.as_deref()),
            created_at,
            updated_at,
        })
    }

    /// Replace every mutable field of an existing entry.
    pub async fn update(&self, entry_id: i64, input: EntryInput) -> Result<(), SafeError> {
        validate_title(&input.title)?;
        let sealed = self.seal(&input)?;
        let now = now_utc();

        let title = input.title.clone();
        let username = input.username;
        let url = input.url;
        let tags = join_tags(&input.tags);
        let changed = self
            .db
            .session(move |tx| {
                tx.execute(
                    "UPDATE vault_entries
                     SET title = ?1, username = ?2, encrypted_password = ?3, url = ?4,
                         notes = ?5, tags = ?6, updated_at = ?7
                     WHERE id = ?8",
                    params![title, username, sealed.password, url, sealed.notes, tags, now, entry_id],
                )
            })
            .await?;

        if changed == 0 {
            return Err(SafeError::not_found(format!("vault entry {entry_id}")));
        }

        debug!(entry_id, "vault entry updated");
        self.publish(VaultEvent::EntryUpdated {
            entry_id,
            title: input.title,
        })
        .await
    }

    /// Remove an entry. Returns whether a row existed; a missing id is not
    /// an error and publishes nothing.
    pub async fn delete(&self, entry_id: i64) -> Result<bool, SafeError> {
        let removed: Option<String> = self
            .db
            .session(move |tx| {
                let title: Option<String> = tx
                    .query_row(
                        "SELECT title FROM vault_entries WHERE id = ?1",
                        params![entry_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if title.is_some() {
                    tx.execute("DELETE FROM vault_entries WHERE id = ?1", params![entry_id])?;
                }
                Ok(title)
            })
            .await?;

        match removed {
            Some(title) => {
                debug!(entry_id, "vault entry deleted");
                self.publish(VaultEvent::EntryDeleted { entry_id, title })
                    .await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn seal(&self, input: &EntryInput) -> Result<SealedFields, SafeError> {
        let key = self.keys.master_key()?;
        let password = self
            .cipher
            .encrypt(input.password.expose_secret().as_bytes(), key.as_bytes())?;
        let notes = input.notes.expose_secret();
        let notes = if notes.is_empty() {
            None
        } else {
            Some(self.cipher.encrypt(notes.as_bytes(), key.as_bytes())?)
        };
        Ok(SealedFields { password, notes })
    }

    fn open(&self, ciphertext: &[u8], key: &SecureBuffer) -> Result<SecretString, SafeError> {
        let plain = self.cipher.decrypt(ciphertext, key.as_bytes())?;
        Ok(SecretString::from(
            String::from_utf8_lossy(plain.as_bytes()).into_owned(),
        ))
    }

    async fn publish(&self, event: VaultEvent) -> Result<(), SafeError> {
        match &self.bus {
            Some(bus) => bus.publish(event, DeliveryMode::Sync).await,
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<(), SafeError> {
    if title.trim().is_empty() {
        return Err(SafeError::invalid("title must not be empty"));
    }
    Ok(())
}

/// Current UTC time, second precision, RFC 3339 with a `Z` suffix.
pub(crate) fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(","))
    }
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
