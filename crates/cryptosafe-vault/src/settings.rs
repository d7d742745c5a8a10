// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value settings, optionally encrypted.
//!
//! Plaintext values are stored as TEXT. Encrypted values are stored as a
//! BLOB of ciphertext in the same column with `encrypted = 1`.

use std::sync::Arc;

use cryptosafe_core::{EncryptionService, KeyProvider, SafeError};
use cryptosafe_storage::Database;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

enum StoredValue {
    Plain(String),
    Sealed(Vec<u8>),
    Null,
}

pub struct SettingsRepository {
    db: Arc<Database>,
    cipher: Arc<dyn EncryptionService>,
    keys: Arc<dyn KeyProvider>,
}

impl SettingsRepository {
    pub fn new(
        db: Arc<Database>,
        cipher: Arc<dyn EncryptionService>,
        keys: Arc<dyn KeyProvider>,
    ) -> Self {
        Self { db, cipher, keys }
    }

    /// Read a setting, decrypting it if it was stored encrypted. Returns
    /// `default` when the key is absent.
    pub async fn get(&self, key: &str, default: Option<&str>) -> Result<Option<String>, SafeError> {
        let key_owned = key.to_string();
        let stored: Option<StoredValue> = self
            .db
            .session(move |tx| {
                tx.query_row(
                    "SELECT setting_value, encrypted FROM settings WHERE setting_key = ?1",
                    params![key_owned],
                    |row| {
                        let encrypted: bool = row.get(1)?;
                        Ok(match row.get_ref(0)? {
                            ValueRef::Null => StoredValue::Null,
                            ValueRef::Blob(b) if encrypted => StoredValue::Sealed(b.to_vec()),
                            ValueRef::Text(t) if encrypted => StoredValue::Sealed(t.to_vec()),
                            ValueRef::Text(t) | ValueRef::Blob(t) => {
                                StoredValue::Plain(String::from_utf8_lossy(t).into_owned())
                            }
                            ValueRef::Integer(i) => StoredValue::Plain(i.to_string()),
                            ValueRef::Real(r) => StoredValue::Plain(r.to_string()),
                        })
                    },
                )
                .optional()
            })
            .await?;

        match stored {
            None => Ok(default.map(str::to_string)),
            Some(StoredValue::Null) => Ok(None),
            Some(StoredValue::Plain(value)) => Ok(Some(value)),
            Some(StoredValue::Sealed(ciphertext)) => {
                let master = self.keys.master_key()?;
                let plain = self.cipher.decrypt(&ciphertext, master.as_bytes())?;
                Ok(Some(String::from_utf8_lossy(plain.as_bytes()).into_owned()))
            }
        }
    }

    /// Insert or replace a setting, encrypting the value when `encrypt` is set.
    pub async fn set(&self, key: &str, value: &str, encrypt: bool) -> Result<(), SafeError> {
        if key.trim().is_empty() {
            return Err(SafeError::invalid("setting key must not be empty"));
        }

        let stored = if encrypt {
            let master = self.keys.master_key()?;
            Value::Blob(self.cipher.encrypt(value.as_bytes(), master.as_bytes())?)
        } else {
            Value::Text(value.to_string())
        };

        let key_owned = key.to_string();
        self.db
            .session(move |tx| {
                tx.execute(
                    "INSERT INTO settings (setting_key, setting_value, encrypted) VALUES (?1, ?2, ?3)
                     ON CONFLICT(setting_key) DO UPDATE SET
                        setting_value = excluded.setting_value, encrypted = excluded.encrypted",
                    params![key_owned, stored, encrypt],
                )?;
                Ok(())
            })
            .await?;

        debug!(key, encrypted = encrypt, "setting stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AesGcmCipher;
    use crate::session::Session;
    use tempfile::TempDir;

    async fn fixture() -> (TempDir, Arc<Database>, Arc<Session>, SettingsRepository) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::with_pool_size(dir.path().join("settings.db"), 2));
        db.connect().await.unwrap();
        let session = Arc::new(Session::new());
        session.unlock(&[11u8; 32], "nak").unwrap();
        let repo = SettingsRepository::new(
            Arc::clone(&db),
            Arc::new(AesGcmCipher::new()),
            session.clone(),
        );
        (dir, db, session, repo)
    }

    #[tokio::test]
    async fn plaintext_roundtrip_and_default() {
        let (_dir, _db, _session, repo) = fixture().await;
        assert_eq!(repo.get("theme", Some("light")).await.unwrap().as_deref(), Some("light"));
        assert_eq!(repo.get("theme", None).await.unwrap(), None);

        repo.set("theme", "dark", false).await.unwrap();
        assert_eq!(repo.get("theme", Some("light")).await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn encrypted_value_is_opaque_on_disk() {
        let (_dir, db, _session, repo) = fixture().await;
        repo.set("api_token", "tok-123", true).await.unwrap();

        let (raw, flag): (Vec<u8>, i64) = db
            .session(|tx| {
                tx.query_row(
                    "SELECT setting_value, encrypted FROM settings WHERE setting_key = 'api_token'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .unwrap();
        assert_eq!(flag, 1);
        assert!(!raw.windows(7).any(|w| w == b"tok-123"));

        assert_eq!(repo.get("api_token", None).await.unwrap().as_deref(), Some("tok-123"));
    }

    #[tokio::test]
    async fn upsert_switches_between_plain_and_encrypted() {
        let (_dir, db, _session, repo) = fixture().await;
        repo.set("pin", "1234", true).await.unwrap();
        repo.set("pin", "5678", false).await.unwrap();
        assert_eq!(repo.get("pin", None).await.unwrap().as_deref(), Some("5678"));

        let rows: i64 = db
            .session(|tx| tx.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn encrypted_read_requires_unlocked_session() {
        let (_dir, _db, session, repo) = fixture().await;
        repo.set("secret", "value", true).await.unwrap();
        repo.set("plain", "visible", false).await.unwrap();
        session.lock();

        assert!(matches!(repo.get("secret", None).await, Err(SafeError::VaultLocked)));
        assert_eq!(repo.get("plain", None).await.unwrap().as_deref(), Some("visible"));
        assert!(matches!(repo.set("secret", "v2", true).await, Err(SafeError::VaultLocked)));
    }

    #[tokio::test]
    async fn blank_key_is_rejected() {
        let (_dir, _db, _session, repo) = fixture().await;
        assert!(matches!(
            repo.set(" ", "v", false).await,
            Err(SafeError::InvalidArgument(_))
        ));
    }
}
