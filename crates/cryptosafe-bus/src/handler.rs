// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event handler trait and a closure adapter.

use async_trait::async_trait;
use cryptosafe_core::SafeError;

use crate::event::VaultEvent;

/// A subscriber that reacts to published events.
///
/// Handlers registered for synchronous delivery run on the publisher's task,
/// and their errors are returned from `publish`. Under asynchronous delivery
/// errors are logged by the worker that ran the handler.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short label used in log fields.
    fn name(&self) -> &str {
        "handler"
    }

    async fn handle(&self, event: &VaultEvent) -> Result<(), SafeError>;
}

/// Wraps a synchronous closure as an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&VaultEvent) -> Result<(), SafeError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&VaultEvent) -> Result<(), SafeError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &VaultEvent) -> Result<(), SafeError> {
        (self.f)(event)
    }
}
