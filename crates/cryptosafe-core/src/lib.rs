// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the CryptoSafe vault.
//!
//! Holds the pieces every other crate agrees on: the [`SafeError`] taxonomy,
//! the [`SecureBuffer`] erasure primitive, and the [`EncryptionService`] and
//! [`KeyProvider`] traits that connect the session to the repositories.

pub mod error;
pub mod secret;
pub mod traits;

pub use error::SafeError;
pub use secret::{with_secure_buffer, SecureBuffer};
pub use traits::{EncryptionService, KeyProvider};
