// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size worker pool draining a shared job queue.
//!
//! Workers are tokio tasks spawned on first use. Shutdown cancels the pool's
//! [`CancellationToken`]: idle workers stop immediately, busy workers finish
//! the job in hand, and whatever is still queued is discarded unstarted.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cryptosafe_core::SafeError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 2;

/// A unit of queued work.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct WorkerPool {
    size: usize,
    sender: mpsc::UnboundedSender<Job>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Create a pool with `size` workers (minimum 1). No task is spawned
    /// until the first [`submit`](Self::submit).
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            size: size.max(1),
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            workers: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Queue `job` for execution. Must be called from within a tokio runtime.
    pub fn submit(&self, job: Job) -> Result<(), SafeError> {
        if self.cancel.is_cancelled() {
            return Err(SafeError::BusShutdown);
        }
        self.ensure_started();
        self.sender.send(job).map_err(|_| SafeError::BusShutdown)
    }

    /// Stop accepting jobs, wait for running jobs, and discard queued ones.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handles = std::mem::take(&mut *self.workers());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "event worker terminated abnormally");
            }
        }

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut discarded = 0usize;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        info!(discarded, "event worker pool shut down");
    }

    fn workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_started(&self) {
        let mut workers = self.workers();
        if !workers.is_empty() {
            return;
        }
        for id in 0..self.size {
            let receiver = Arc::clone(&self.receiver);
            let cancel = self.cancel.clone();
            workers.push(tokio::spawn(worker_loop(id, receiver, cancel)));
        }
        debug!(workers = self.size, "event worker pool started");
    }
}

async fn worker_loop(
    id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        match job {
            // A panicking job must not take its worker down with it.
            Some(job) => {
                if let Err(e) = tokio::spawn(job).await {
                    warn!(worker = id, error = %e, "event job aborted");
                }
            }
            None => break,
        }
    }
    debug!(worker = id, "event worker stopped");
}
