// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event subscriber that turns vault events into audit rows.

use std::sync::Arc;

use async_trait::async_trait;
use cryptosafe_bus::{EventBus, EventHandler, EventKind, VaultEvent};
use cryptosafe_core::SafeError;
use serde_json::json;
use strum::IntoEnumIterator;
use tracing::info;

use crate::repository::AuditRepository;

/// Writes exactly one audit row per event it receives. Failed writes are
/// not retried; the error goes back through the bus to the publisher.
pub struct AuditLogger {
    repo: AuditRepository,
}

impl AuditLogger {
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    /// Subscribe one handler per event kind on `bus`.
    pub fn start(self: &Arc<Self>, bus: &EventBus) {
        for kind in EventKind::iter() {
            bus.subscribe(kind, Arc::clone(self) as Arc<dyn EventHandler>);
        }
        info!("audit logger subscribed");
    }
}

/// Stored action name for `event`.
pub fn action_name(event: &VaultEvent) -> &'static str {
    event.into()
}

fn details(event: &VaultEvent) -> serde_json::Value {
    match event {
        VaultEvent::EntryAdded { title, .. }
        | VaultEvent::EntryUpdated { title, .. }
        | VaultEvent::EntryDeleted { title, .. } => json!({ "title": title }),
        VaultEvent::UserLoggedIn { username } | VaultEvent::UserLoggedOut { username } => {
            json!({ "username": username })
        }
    }
}

#[async_trait]
impl EventHandler for AuditLogger {
    fn name(&self) -> &str {
        "audit-logger"
    }

    async fn handle(&self, event: &VaultEvent) -> Result<(), SafeError> {
        self.repo
            .write(action_name(event), &details(event), event.entry_id())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_carry_title_or_username() {
        let added = VaultEvent::EntryAdded {
            entry_id: 1,
            title: "GitHub".into(),
        };
        assert_eq!(action_name(&added), "EntryAdded");
        assert_eq!(details(&added), json!({"title": "GitHub"}));

        let out = VaultEvent::UserLoggedOut {
            username: "nak".into(),
        };
        assert_eq!(action_name(&out), "UserLoggedOut");
        assert_eq!(details(&out), json!({"username": "nak"}));
    }
}
