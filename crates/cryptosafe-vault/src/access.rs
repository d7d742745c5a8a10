// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Setup, unlock, and lock flows tying the key manager to the session.

use std::sync::Arc;

use cryptosafe_bus::{DeliveryMode, EventBus, VaultEvent};
use cryptosafe_config::model::VaultConfig;
use cryptosafe_core::SafeError;
use secrecy::SecretString;
use tracing::info;

use crate::kdf::{KdfParams, DEFAULT_SALT_LENGTH, MIN_SALT_LENGTH};
use crate::keys::{KeyManager, MASTER_KEY_TYPE};
use crate::session::Session;

pub struct VaultAccess {
    keys: KeyManager,
    session: Arc<Session>,
    bus: Option<Arc<EventBus>>,
    params: KdfParams,
    salt_length: usize,
}

impl VaultAccess {
    pub fn new(keys: KeyManager, session: Arc<Session>) -> Self {
        Self {
            keys,
            session,
            bus: None,
            params: KdfParams::default(),
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }

    /// Use the iteration count and salt length from `[vault]` for new keys.
    pub fn with_config(mut self, config: &VaultConfig) -> Self {
        self.params = KdfParams::with_iterations(config.kdf_iterations);
        self.salt_length = config.salt_length.max(MIN_SALT_LENGTH);
        self
    }

    /// Publish `UserLoggedIn`/`UserLoggedOut` on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Whether a master key record exists.
    pub async fn is_initialized(&self) -> Result<bool, SafeError> {
        self.keys.has_key(MASTER_KEY_TYPE).await
    }

    /// Create the master key record from `password` and unlock the session.
    ///
    /// An existing record is replaced.
    pub async fn setup(&self, username: &str, password: &SecretString) -> Result<(), SafeError> {
        let key = self
            .keys
            .setup(MASTER_KEY_TYPE, password, &self.params, self.salt_length)
            .await?;
        self.session.unlock(key.as_bytes(), username)?;
        info!(username, "vault initialized");
        self.publish(VaultEvent::UserLoggedIn {
            username: username.to_string(),
        })
        .await
    }

    /// Verify `password` and unlock the session. Fails with `WrongPassword`
    /// or `NotFound` (no vault yet) and leaves the session untouched.
    pub async fn unlock(&self, username: &str, password: &SecretString) -> Result<(), SafeError> {
        let key = self.keys.verify(MASTER_KEY_TYPE, password).await?;
        self.session.unlock(key.as_bytes(), username)?;
        info!(username, "vault unlocked");
        self.publish(VaultEvent::UserLoggedIn {
            username: username.to_string(),
        })
        .await
    }

    /// Lock the session. Only a transition from unlocked publishes an event.
    pub async fn lock(&self) -> Result<(), SafeError> {
        let Some(username) = self.session.lock() else {
            return Ok(());
        };
        info!("vault locked");
        self.publish(VaultEvent::UserLoggedOut { username }).await
    }

    async fn publish(&self, event: VaultEvent) -> Result<(), SafeError> {
        match &self.bus {
            Some(bus) => bus.publish(event, DeliveryMode::Sync).await,
            None => Ok(()),
        }
    }
}
