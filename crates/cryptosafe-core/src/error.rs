// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the CryptoSafe vault.

use thiserror::Error;

/// The error type shared by every CryptoSafe crate.
#[derive(Debug, Error)]
pub enum SafeError {
    /// Empty or too-short input (password, salt, key, title, setting key).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A key was requested while the session is locked.
    #[error("vault is locked")]
    VaultLocked,

    /// The password did not match the stored verifier.
    #[error("wrong master password")]
    WrongPassword,

    /// A requested record does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The database was written by an incompatible schema version.
    #[error("incompatible database schema version {found} (expected {expected})")]
    SchemaIncompatible { found: i64, expected: i64 },

    /// Underlying storage failure. The active transaction has been rolled back.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage was used before `connect()` or after `close()`.
    #[error("database is not connected -- call connect() first")]
    NotConnected,

    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// The event bus no longer accepts asynchronous work.
    #[error("event bus has been shut down")]
    BusShutdown,

    /// Placeholder for features that are not built yet (backup, restore).
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SafeError {
    /// Shorthand for [`SafeError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`SafeError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Wrap any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Lock-state errors are recoverable: re-prompt for the password and retry.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::VaultLocked)
    }

    /// Storage and schema failures end the current session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::SchemaIncompatible { .. } | Self::NotConnected
        )
    }
}
