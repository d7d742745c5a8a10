// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master key records: derivation, verifier storage, and password checks.
//!
//! `key_store` holds at most one row per key type. Writes are upserts, so
//! running setup again replaces the record instead of adding a second one.

use std::sync::Arc;

use cryptosafe_core::{SafeError, SecureBuffer};
use cryptosafe_storage::Database;
use rusqlite::{params, OptionalExtension};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::kdf::{self, KdfParams};

/// Key type used for the vault's master password.
pub const MASTER_KEY_TYPE: &str = "master";

/// A key record as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    pub salt: Vec<u8>,
    pub verifier: Vec<u8>,
    pub params: KdfParams,
    /// The stored parameter blob was unreadable and `params` holds defaults.
    pub params_fallback: bool,
}

pub struct KeyManager {
    db: Arc<Database>,
}

impl KeyManager {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// See [`kdf::derive_key`].
    pub fn derive_key(
        &self,
        password: &str,
        salt: &[u8],
        params: &KdfParams,
    ) -> Result<SecureBuffer, SafeError> {
        kdf::derive_key(password, salt, params)
    }

    pub fn make_salt(length: usize) -> Result<Vec<u8>, SafeError> {
        kdf::make_salt(length)
    }

    pub fn verifier(key: &[u8]) -> Vec<u8> {
        kdf::verifier(key)
    }

    /// Insert or replace the record for `key_type`.
    pub async fn store_key(
        &self,
        key_type: &str,
        salt: &[u8],
        verifier: &[u8],
        params: &KdfParams,
    ) -> Result<(), SafeError> {
        if key_type.trim().is_empty() {
            return Err(SafeError::invalid("key type must not be empty"));
        }
        if salt.is_empty() {
            return Err(SafeError::invalid("salt must not be empty"));
        }
        if verifier.is_empty() {
            return Err(SafeError::invalid("verifier must not be empty"));
        }

        let key_type_owned = key_type.to_string();
        let salt = salt.to_vec();
        let verifier = verifier.to_vec();
        let params_json = params.to_json()?;
        self.db
            .session(move |tx| {
                tx.execute(
                    "INSERT INTO key_store (key_type, salt, hash, params) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key_type) DO UPDATE SET
                        salt = excluded.salt, hash = excluded.hash, params = excluded.params",
                    params![key_type_owned, salt, verifier, params_json],
                )?;
                Ok(())
            })
            .await?;

        debug!(key_type, "key record stored");
        Ok(())
    }

    /// Read the record for `key_type`, or `None` if there is none.
    pub async fn load_key(&self, key_type: &str) -> Result<Option<StoredKey>, SafeError> {
        type Row = (Vec<u8>, Vec<u8>, Option<String>);
        let key_type_owned = key_type.to_string();
        let row: Option<Row> = self
            .db
            .session(move |tx| {
                tx.query_row(
                    "SELECT salt, hash, params FROM key_store WHERE key_type = ?1",
                    params![key_type_owned],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
            })
            .await?;

        Ok(row.map(|(salt, verifier, raw_params)| {
            let (params, params_fallback) = KdfParams::from_json_or_default(raw_params.as_deref());
            StoredKey {
                salt,
                verifier,
                params,
                params_fallback,
            }
        }))
    }

    pub async fn has_key(&self, key_type: &str) -> Result<bool, SafeError> {
        let key_type_owned = key_type.to_string();
        self.db
            .session(move |tx| {
                tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM key_store WHERE key_type = ?1)",
                    params![key_type_owned],
                    |row| row.get(0),
                )
            })
            .await
    }

    /// Create (or replace) the key record for `key_type` from `password` and
    /// return the derived key.
    ///
    /// Derivation runs on the blocking thread pool.
    pub async fn setup(
        &self,
        key_type: &str,
        password: &SecretString,
        params: &KdfParams,
        salt_length: usize,
    ) -> Result<SecureBuffer, SafeError> {
        let salt = kdf::make_salt(salt_length)?;
        let key = derive_blocking(password, salt.clone(), params.clone()).await?;
        let verifier = kdf::verifier(key.as_bytes());
        self.store_key(key_type, &salt, &verifier, params).await?;

        info!(key_type, iterations = params.iterations, "master key set up");
        Ok(key)
    }

    /// Check `password` against the stored verifier and return the derived
    /// key on success.
    pub async fn verify(
        &self,
        key_type: &str,
        password: &SecretString,
    ) -> Result<SecureBuffer, SafeError> {
        let stored = self
            .load_key(key_type)
            .await?
            .ok_or_else(|| SafeError::not_found(format!("key record `{key_type}`")))?;

        let key = derive_blocking(password, stored.salt, stored.params).await?;
        if !kdf::verifiers_match(&stored.verifier, &kdf::verifier(key.as_bytes())) {
            debug!(key_type, "password verification failed");
            return Err(SafeError::WrongPassword);
        }
        Ok(key)
    }
}

async fn derive_blocking(
    password: &SecretString,
    salt: Vec<u8>,
    params: KdfParams,
) -> Result<SecureBuffer, SafeError> {
    let password = Zeroizing::new(password.expose_secret().to_owned());
    tokio::task::spawn_blocking(move || kdf::derive_key(&password, &salt, &params))
        .await
        .map_err(|e| SafeError::Internal(format!("key derivation task failed: {e}")))?
}
