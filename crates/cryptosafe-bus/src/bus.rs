// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish/subscribe dispatcher keyed by [`EventKind`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cryptosafe_core::SafeError;
use tracing::{debug, error};

use crate::event::{EventKind, VaultEvent};
use crate::handler::EventHandler;
use crate::pool::{WorkerPool, DEFAULT_WORKERS};

/// How `publish` delivers an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Run handlers in subscription order before `publish` returns.
    #[default]
    Sync,
    /// Queue one job per handler on the worker pool and return immediately.
    Async,
}

type Registry = HashMap<EventKind, Vec<Arc<dyn EventHandler>>>;

/// Typed event bus.
///
/// The subscriber registry is guarded by a mutex that is only held long
/// enough to append a handler or copy a handler list. Handlers never run
/// under it.
pub struct EventBus {
    handlers: Mutex<Registry>,
    pool: WorkerPool,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl EventBus {
    /// Create a bus whose async deliveries run on `workers` tasks.
    pub fn new(workers: usize) -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            pool: WorkerPool::new(workers),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `handler` to the list for `kind`.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        debug!(%kind, handler = handler.name(), "handler subscribed");
        self.registry().entry(kind).or_default().push(handler);
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler subscribed to its kind.
    ///
    /// In [`DeliveryMode::Sync`] the first handler error stops delivery and
    /// is returned. In [`DeliveryMode::Async`] only submission can fail
    /// (with `BusShutdown`).
    pub async fn publish(&self, event: VaultEvent, mode: DeliveryMode) -> Result<(), SafeError> {
        let kind = event.kind();
        if mode == DeliveryMode::Async && self.pool.is_shut_down() {
            return Err(SafeError::BusShutdown);
        }
        let snapshot: Vec<Arc<dyn EventHandler>> =
            self.registry().get(&kind).cloned().unwrap_or_default();

        if snapshot.is_empty() {
            debug!(%kind, "event published with no subscribers");
            return Ok(());
        }

        match mode {
            DeliveryMode::Sync => {
                for handler in snapshot {
                    handler.handle(&event).await?;
                }
                Ok(())
            }
            DeliveryMode::Async => {
                let event = Arc::new(event);
                for handler in snapshot {
                    let event = Arc::clone(&event);
                    self.pool.submit(Box::pin(async move {
                        if let Err(e) = handler.handle(&event).await {
                            error!(
                                kind = %event.kind(),
                                handler = handler.name(),
                                error = %e,
                                "async event handler failed"
                            );
                        }
                    }))?;
                }
                Ok(())
            }
        }
    }

    /// Stop async delivery. Running handlers complete; queued ones are
    /// discarded. Synchronous publishing keeps working.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
