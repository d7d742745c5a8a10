// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock/unlock state and the single in-memory copy of the master key.

use std::sync::{Mutex, MutexGuard, PoisonError};

use cryptosafe_core::{KeyProvider, SafeError, SecureBuffer};
use tracing::debug;

#[derive(Default)]
struct State {
    username: Option<String>,
    key: Option<SecureBuffer>,
}

impl State {
    fn clear(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.wipe();
        }
        self.username = None;
    }
}

/// Process-wide session: `Locked` until [`unlock`](Session::unlock), back to
/// `Locked` on [`lock`](Session::lock) or drop.
///
/// The held key is zeroed whenever it is replaced or released. Callers get
/// copies from [`get_master_key`](Session::get_master_key) which are zeroed
/// when they are dropped.
#[derive(Default)]
pub struct Session {
    state: Mutex<State>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("unlocked", &self.is_unlocked())
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a private copy of `master_key` and mark the session unlocked.
    pub fn unlock(&self, master_key: &[u8], username: &str) -> Result<(), SafeError> {
        if master_key.is_empty() {
            return Err(SafeError::invalid("master key must not be empty"));
        }
        let mut state = self.state();
        state.clear();
        state.key = Some(SecureBuffer::from_slice(master_key));
        state.username = Some(username.to_string());
        drop(state);

        debug!(username, "session unlocked");
        Ok(())
    }

    /// Wipe the key and return to `Locked`. Calling it while locked is a no-op.
    ///
    /// Returns the username of the session that was closed, or `None` if the
    /// session was already locked. The check and the wipe happen under one
    /// lock, so concurrent callers see `Some` at most once per unlock.
    pub fn lock(&self) -> Option<String> {
        let mut state = self.state();
        let was_unlocked = state.key.is_some();
        let username = state.username.take();
        state.clear();
        drop(state);

        if !was_unlocked {
            return None;
        }
        debug!("session locked");
        Some(username.unwrap_or_default())
    }

    /// A copy of the master key, or `VaultLocked`.
    pub fn get_master_key(&self) -> Result<SecureBuffer, SafeError> {
        self.state().key.clone().ok_or(SafeError::VaultLocked)
    }

    pub fn is_unlocked(&self) -> bool {
        self.state().key.is_some()
    }

    pub fn username(&self) -> Option<String> {
        self.state().username.clone()
    }
}

impl KeyProvider for Session {
    fn master_key(&self) -> Result<SecureBuffer, SafeError> {
        self.get_master_key()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.state().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn locked_until_unlocked_and_after_lock() {
        let session = Session::new();
        assert!(matches!(session.get_master_key(), Err(SafeError::VaultLocked)));

        session.unlock(b"0123456789abcdef", "nak").unwrap();
        assert!(session.is_unlocked());
        assert_eq!(session.username().as_deref(), Some("nak"));
        assert_eq!(session.get_master_key().unwrap().as_bytes(), b"0123456789abcdef");

        session.lock();
        assert!(!session.is_unlocked());
        assert_eq!(session.username(), None);
        assert!(matches!(session.get_master_key(), Err(SafeError::VaultLocked)));
    }

    #[test]
    fn lock_is_idempotent() {
        let session = Session::new();
        assert_eq!(session.lock(), None);
        session.unlock(b"key", "nak").unwrap();
        assert_eq!(session.lock().as_deref(), Some("nak"));
        assert_eq!(session.lock(), None);
        assert!(!session.is_unlocked());
    }

    #[test]
    fn concurrent_locks_report_one_closed_session() {
        let session = Arc::new(Session::new());
        session.unlock(b"key", "nak").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || session.lock())
            })
            .collect();
        let closed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Option::is_some)
            .count();
        assert_eq!(closed, 1);
    }

    #[test]
    fn unlock_rejects_empty_key() {
        let session = Session::new();
        assert!(matches!(
            session.unlock(b"", "nak"),
            Err(SafeError::InvalidArgument(_))
        ));
        assert!(!session.is_unlocked());
    }

    #[test]
    fn unlock_replaces_previous_key() {
        let session = Session::new();
        session.unlock(b"first-key", "a").unwrap();
        session.unlock(b"second-key", "b").unwrap();
        assert_eq!(session.get_master_key().unwrap().as_bytes(), b"second-key");
        assert_eq!(session.username().as_deref(), Some("b"));
    }

    #[test]
    fn returned_key_is_a_copy() {
        let session = Session::new();
        session.unlock(b"key-material", "nak").unwrap();
        let mut copy = session.get_master_key().unwrap();
        copy.wipe();
        assert_eq!(session.get_master_key().unwrap().as_bytes(), b"key-material");
    }

    #[test]
    fn usable_as_key_provider() {
        let session = Arc::new(Session::new());
        let provider: Arc<dyn KeyProvider> = session.clone();
        assert!(provider.master_key().unwrap_err().is_locked());
        session.unlock(b"k", "nak").unwrap();
        assert_eq!(provider.master_key().unwrap().as_bytes(), b"k");
    }
}
