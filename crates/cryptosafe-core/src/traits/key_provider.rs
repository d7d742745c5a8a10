// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability handed to repositories for obtaining the live master key.

use crate::error::SafeError;
use crate::secret::SecureBuffer;

/// Source of the current master key.
///
/// Returns a copy that the caller drops as soon as the operation
/// is done. Fails with [`SafeError::VaultLocked`] while no key is loaded.
pub trait KeyProvider: Send + Sync {
    fn master_key(&self) -> Result<SecureBuffer, SafeError>;
}
