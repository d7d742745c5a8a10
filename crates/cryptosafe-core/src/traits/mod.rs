// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the session, the cipher, and the repositories.

pub mod cipher;
pub mod key_provider;

pub use cipher::EncryptionService;
pub use key_provider::KeyProvider;
