// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus for CryptoSafe.
//!
//! Vault operations publish [`VaultEvent`]s; subscribers such as the audit
//! logger register an [`EventHandler`] per [`EventKind`].

pub mod bus;
pub mod event;
pub mod handler;
pub mod pool;

pub use bus::{DeliveryMode, EventBus};
pub use event::{EventKind, VaultEvent};
pub use handler::{EventHandler, FnHandler};
pub use pool::WorkerPool;
