// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain events published by the vault.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Every event the vault emits. The set is closed: adding a variant forces
/// every exhaustive match (including [`VaultEvent::kind`]) to handle it.
///
/// Converting into `&'static str` yields the variant name (`"EntryAdded"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    EntryAdded { entry_id: i64, title: String },
    EntryUpdated { entry_id: i64, title: String },
    EntryDeleted { entry_id: i64, title: String },
    UserLoggedIn { username: String },
    UserLoggedOut { username: String },
}

/// Discriminant of [`VaultEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    EntryAdded,
    EntryUpdated,
    EntryDeleted,
    UserLoggedIn,
    UserLoggedOut,
}

impl VaultEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            VaultEvent::EntryAdded { .. } => EventKind::EntryAdded,
            VaultEvent::EntryUpdated { .. } => EventKind::EntryUpdated,
            VaultEvent::EntryDeleted { .. } => EventKind::EntryDeleted,
            VaultEvent::UserLoggedIn { .. } => EventKind::UserLoggedIn,
            VaultEvent::UserLoggedOut { .. } => EventKind::UserLoggedOut,
        }
    }

    /// The vault entry this event concerns, if any.
    pub fn entry_id(&self) -> Option<i64> {
        match self {
            VaultEvent::EntryAdded { entry_id, .. }
            | VaultEvent::EntryUpdated { entry_id, .. }
            | VaultEvent::EntryDeleted { entry_id, .. } => Some(*entry_id),
            VaultEvent::UserLoggedIn { .. } | VaultEvent::UserLoggedOut { .. } => None,
        }
    }
}
