// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component wiring: storage, bus, audit logger, session, repositories.

use std::sync::Arc;

use cryptosafe_audit::{AuditLogger, AuditRepository};
use cryptosafe_bus::EventBus;
use cryptosafe_config::CryptosafeConfig;
use cryptosafe_core::{EncryptionService, SafeError};
use cryptosafe_storage::Database;
use cryptosafe_vault::{
    AesGcmCipher, KeyManager, Session, SettingsRepository, VaultAccess, VaultRepository,
};
use tracing::{debug, info};

/// Every long-lived component of a running vault.
pub struct App {
    pub db: Arc<Database>,
    pub bus: Arc<EventBus>,
    pub access: VaultAccess,
    pub entries: VaultRepository,
    pub settings: SettingsRepository,
    pub audit: AuditRepository,
}

impl App {
    /// Connect storage and wire all components. The session starts locked.
    pub async fn open(config: &CryptosafeConfig) -> Result<Self, SafeError> {
        let db = Arc::new(Database::from_config(&config.storage));
        db.connect().await?;

        let bus = Arc::new(EventBus::new(config.bus.workers));
        let logger = Arc::new(AuditLogger::new(AuditRepository::new(Arc::clone(&db))));
        logger.start(&bus);

        let session = Arc::new(Session::new());
        let cipher: Arc<dyn EncryptionService> = Arc::new(AesGcmCipher::new());

        let access = VaultAccess::new(KeyManager::new(Arc::clone(&db)), Arc::clone(&session))
            .with_config(&config.vault)
            .with_events(Arc::clone(&bus));
        let entries = VaultRepository::new(Arc::clone(&db), Arc::clone(&cipher), session.clone())
            .with_events(Arc::clone(&bus));
        let settings = SettingsRepository::new(Arc::clone(&db), cipher, session.clone());
        let audit = AuditRepository::new(Arc::clone(&db));

        info!(
            path = %config.storage.database_path,
            cipher = "aes-256-gcm",
            "vault opened"
        );
        Ok(Self {
            db,
            bus,
            access,
            entries,
            settings,
            audit,
        })
    }

    /// Lock the session, stop async delivery, and close storage.
    pub async fn close(self) -> Result<(), SafeError> {
        let locked = self.access.lock().await;
        self.bus.shutdown().await;
        self.db.close().await;
        debug!("vault closed");
        locked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptosafe_vault::EntryInput;
    use secrecy::{ExposeSecret, SecretString};

    fn test_config(dir: &tempfile::TempDir) -> CryptosafeConfig {
        let mut config = CryptosafeConfig::default();
        config.storage.database_path = dir.path().join("app.db").display().to_string();
        config.storage.pool_size = 2;
        config.vault.kdf_iterations = 1_000;
        config
    }

    #[tokio::test]
    async fn open_setup_add_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let password = SecretString::from("master-pass".to_string());

        let app = App::open(&config).await.unwrap();
        assert!(!app.access.session().is_unlocked());
        app.access.setup("nak", &password).await.unwrap();
        let id = app
            .entries
            .add(EntryInput::new("GitHub", SecretString::from("p@ss".to_string())))
            .await
            .unwrap();
        app.close().await.unwrap();

        let app = App::open(&config).await.unwrap();
        assert!(app.access.is_initialized().await.unwrap());
        app.access.unlock("nak", &password).await.unwrap();
        let entry = app.entries.get_by_id(id).await.unwrap();
        assert_eq!(entry.password.expose_secret(), "p@ss");

        let actions: Vec<String> = app
            .audit
            .last(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.action)
            .collect();
        assert_eq!(
            actions,
            vec!["UserLoggedIn", "UserLoggedOut", "EntryAdded", "UserLoggedIn"]
        );
        app.close().await.unwrap();
    }
}
