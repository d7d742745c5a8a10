// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Symmetric cipher contract consumed by the encrypted repositories.

use crate::error::SafeError;
use crate::secret::SecureBuffer;

/// Keyed, reversible encryption of field values.
///
/// Implementations never hold the key: it is passed on every call and must
/// be non-empty (`InvalidArgument` otherwise). Any key length is accepted.
pub trait EncryptionService: Send + Sync {
    /// Human-readable cipher name, for logs.
    fn name(&self) -> &str;

    /// Encrypt `plaintext` under `key`.
    fn encrypt(&self, plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, SafeError>;

    /// Decrypt `ciphertext` under `key`. The plaintext is returned in a
    /// zero-on-drop buffer.
    fn decrypt(&self, ciphertext: &[u8], key: &[u8]) -> Result<SecureBuffer, SafeError>;
}
