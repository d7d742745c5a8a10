// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit trail for CryptoSafe.

pub mod logger;
pub mod repository;

pub use logger::{action_name, AuditLogger};
pub use repository::{AuditRecord, AuditRepository, DEFAULT_LIMIT};
