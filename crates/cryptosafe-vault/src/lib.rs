// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master key handling and encrypted repositories for CryptoSafe.
//!
//! A password is turned into a key by [`kdf`]; [`KeyManager`] persists only
//! its salt and verifier. The live key sits in the [`Session`], which the
//! repositories reach through the `KeyProvider` trait.

pub mod access;
pub mod crypto;
pub mod entries;
pub mod kdf;
pub mod keys;
pub mod session;
pub mod settings;

pub use access::VaultAccess;
pub use crypto::AesGcmCipher;
pub use entries::{EntryDetail, EntryInput, EntrySummary, VaultRepository};
pub use kdf::KdfParams;
pub use keys::{KeyManager, StoredKey, MASTER_KEY_TYPE};
pub use session::Session;
pub use settings::SettingsRepository;
