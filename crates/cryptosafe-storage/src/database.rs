// SPDX-FileCopyrightText: 2026 CryptoSafe Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection pool with PRAGMA setup, WAL mode, and lifecycle.
//!
//! [`Database`] owns a fixed number of `tokio-rusqlite` connections. Each
//! connection runs SQLite on its own background thread; callers borrow one
//! for the duration of a [`Database::session`] closure. When every
//! connection is checked out, acquisition waits until one is returned. That
//! wait is the only backpressure in the storage layer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cryptosafe_config::model::StorageConfig;
use cryptosafe_core::SafeError;
use rusqlite::{Transaction, TransactionBehavior};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::schema::{self, SchemaCheck};

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Pooled SQLite storage engine.
///
/// `connect()` is idempotent. `close()` returns the engine to its initial
/// state so that it can be connected again, possibly to a different file
/// via [`Database::connect_to`].
pub struct Database {
    pool_size: usize,
    inner: tokio::sync::Mutex<Inner>,
}

struct Inner {
    path: PathBuf,
    pool: Option<Arc<Pool>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create an unconnected engine for `path` with the default pool size.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_pool_size(path, DEFAULT_POOL_SIZE)
    }

    /// Create an unconnected engine with an explicit pool size (minimum 1).
    pub fn with_pool_size(path: impl Into<PathBuf>, pool_size: usize) -> Self {
        Self {
            pool_size: pool_size.max(1),
            inner: tokio::sync::Mutex::new(Inner {
                path: path.into(),
                pool: None,
            }),
        }
    }

    /// Create an unconnected engine from the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_pool_size(&config.database_path, config.pool_size)
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// The database file this engine targets.
    pub async fn path(&self) -> PathBuf {
        self.inner.lock().await.path.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.pool.is_some()
    }

    /// Open the pool and enforce the schema version.
    ///
    /// A second call while connected is a no-op. If the stored schema
    /// version is incompatible, every opened connection is closed again,
    /// the engine stays unconnected, and `SchemaIncompatible` is returned.
    pub async fn connect(&self) -> Result<(), SafeError> {
        let mut inner = self.inner.lock().await;
        if inner.pool.is_some() {
            debug!(path = %inner.path.display(), "database already connected");
            return Ok(());
        }

        if let Some(parent) = inner.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SafeError::storage)?;
        }

        let mut conns = Vec::with_capacity(self.pool_size);
        for _ in 0..self.pool_size {
            match open_connection(&inner.path).await {
                Ok(conn) => conns.push(conn),
                Err(e) => {
                    close_all(conns).await;
                    return Err(e);
                }
            }
        }

        let pool = Arc::new(Pool::new(conns));
        if let Err(e) = check_schema(&pool).await {
            warn!(path = %inner.path.display(), error = %e, "schema check failed -- closing pool");
            pool.shutdown().await;
            return Err(e);
        }

        info!(
            path = %inner.path.display(),
            pool_size = self.pool_size,
            "database connected"
        );
        inner.pool = Some(pool);
        Ok(())
    }

    /// Close the current pool (if any), retarget the engine, and connect.
    pub async fn connect_to(&self, path: impl Into<PathBuf>) -> Result<(), SafeError> {
        self.close().await;
        self.inner.lock().await.path = path.into();
        self.connect().await
    }

    /// Close every idle connection and reset to the unconnected state.
    ///
    /// Connections still checked out are closed when they are released.
    /// Waiters blocked on acquisition fail with `NotConnected`.
    pub async fn close(&self) {
        let pool = self.inner.lock().await.pool.take();
        if let Some(pool) = pool {
            pool.shutdown().await;
            debug!("database closed");
        }
    }

    /// Borrow a connection, waiting while the pool is exhausted.
    ///
    /// The connection goes back to the pool when the guard is dropped.
    pub async fn acquire(&self) -> Result<PooledConnection, SafeError> {
        let pool = self.pool().await?;
        pool.acquire().await
    }

    /// Number of connections currently sitting in the pool.
    pub async fn idle_connections(&self) -> usize {
        match self.inner.lock().await.pool.as_ref() {
            Some(pool) => pool.idle().conns.len(),
            None => 0,
        }
    }

    /// Run `f` inside a transaction on a pooled connection.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`; the error is then propagated as `SafeError::Storage`.
    /// The connection is returned to the pool on every path.
    pub async fn session<F, R>(&self, f: F) -> Result<R, SafeError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.acquire().await?;
        conn.call(move |c| run_in_transaction(c, f)).await
    }

    /// Copy the database to `backup_path`. Not built yet.
    pub fn backup(&self, _backup_path: &Path) -> Result<(), SafeError> {
        Err(SafeError::NotImplemented("database backup"))
    }

    /// Replace the database with `backup_path`. Not built yet.
    pub fn restore(&self, _backup_path: &Path) -> Result<(), SafeError> {
        Err(SafeError::NotImplemented("database restore"))
    }

    async fn pool(&self) -> Result<Arc<Pool>, SafeError> {
        self.inner
            .lock()
            .await
            .pool
            .clone()
            .ok_or(SafeError::NotConnected)
    }
}

/// Fixed set of connections guarded by a semaphore with one permit each.
struct Pool {
    permits: Arc<Semaphore>,
    idle: Mutex<IdleConnections>,
}

struct IdleConnections {
    conns: Vec<Connection>,
    closed: bool,
}

impl Pool {
    fn new(conns: Vec<Connection>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(conns.len())),
            idle: Mutex::new(IdleConnections {
                conns,
                closed: false,
            }),
        }
    }

    fn idle(&self) -> MutexGuard<'_, IdleConnections> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(self: &Arc<Self>) -> Result<PooledConnection, SafeError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SafeError::NotConnected)?;

        let conn = {
            let mut idle = self.idle();
            if idle.closed {
                return Err(SafeError::NotConnected);
            }
            idle.conns.pop()
        }
        .ok_or_else(|| SafeError::Internal("connection pool empty despite free permit".into()))?;

        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle();
        if idle.closed {
            // Dropping the handle stops its background thread.
            drop(idle);
            drop(conn);
            debug!("released connection into closed pool -- dropped");
            return;
        }
        idle.conns.push(conn);
    }

    async fn shutdown(&self) {
        self.permits.close();
        let conns = {
            let mut idle = self.idle();
            idle.closed = true;
            std::mem::take(&mut idle.conns)
        };
        close_all(conns).await;
    }
}

/// A connection on loan from the pool.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<Pool>,
    // Released after `Drop::drop` has put the connection back.
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    /// Run `f` on the connection's background thread.
    pub async fn call<F, R>(&self, f: F) -> Result<R, SafeError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, rusqlite::Error> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.conn.as_ref().ok_or(SafeError::NotConnected)?;
        conn.call(f).await.map_err(map_tr_err)
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

async fn open_connection(path: &Path) -> Result<Connection, SafeError> {
    let conn = Connection::open(path.to_path_buf())
        .await
        .map_err(SafeError::storage)?;
    conn.call(|c| -> Result<(), rusqlite::Error> {
        c.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)?;
    Ok(conn)
}

async fn close_all(conns: Vec<Connection>) {
    for conn in conns {
        if let Err(e) = conn.close().await {
            warn!(error = %e, "failed to close pooled connection");
        }
    }
}

async fn check_schema(pool: &Arc<Pool>) -> Result<(), SafeError> {
    let conn = pool.acquire().await?;
    let check = conn
        .call(|c| run_in_transaction(c, schema::ensure_schema))
        .await?;
    if check == SchemaCheck::Created {
        info!(version = schema::SCHEMA_VERSION, "database schema created");
    }
    check.into_result()
}

fn run_in_transaction<F, R>(conn: &mut rusqlite::Connection, f: F) -> Result<R, rusqlite::Error>
where
    F: FnOnce(&Transaction<'_>) -> Result<R, rusqlite::Error>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(e)
        }
    }
}

/// Convert tokio-rusqlite errors to `SafeError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SafeError {
    SafeError::storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn connect_creates_file_and_pool() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("vault.db");
        let db = Database::new(&db_path);

        assert!(!db.is_connected().await);
        db.connect().await.unwrap();
        assert!(db.is_connected().await);
        assert!(db_path.exists(), "database file should be created");
        assert_eq!(db.idle_connections().await, DEFAULT_POOL_SIZE);

        db.close().await;
        assert!(!db.is_connected().await);
    }

    #[tokio::test]
    async fn session_commits_on_success() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("commit.db"));
        db.connect().await.unwrap();

        db.session(|tx| {
            tx.execute(
                "INSERT INTO settings (setting_key, setting_value) VALUES ('theme', 'dark')",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let value: String = db
            .session(|tx| {
                tx.query_row(
                    "SELECT setting_value FROM settings WHERE setting_key = 'theme'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(value, "dark");
    }

    #[tokio::test]
    async fn session_rolls_back_on_error_and_releases_connection() {
        let dir = tempdir().unwrap();
        let db = Database::with_pool_size(dir.path().join("rollback.db"), 2);
        db.connect().await.unwrap();

        let result: Result<(), SafeError> = db
            .session(|tx| {
                tx.execute(
                    "INSERT INTO settings (setting_key, setting_value) VALUES ('lang', 'en')",
                    [],
                )?;
                Err(rusqlite::Error::QueryReturnedNoRows)
            })
            .await;
        assert!(matches!(result, Err(SafeError::Storage { .. })));

        let count: i64 = db
            .session(|tx| tx.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0, "failed session must not leave rows behind");
        assert_eq!(db.idle_connections().await, 2);
    }

    #[tokio::test]
    async fn session_before_connect_fails() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("unconnected.db"));
        let result = db.session(|_tx| Ok(())).await;
        assert!(matches!(result, Err(SafeError::NotConnected)));
    }

    #[tokio::test]
    async fn exhausted_pool_blocks_until_release() {
        let dir = tempdir().unwrap();
        let db = Database::with_pool_size(dir.path().join("exhaust.db"), 1);
        db.connect().await.unwrap();

        let held = db.acquire().await.unwrap();
        assert_eq!(db.idle_connections().await, 0);

        let blocked = tokio::time::timeout(Duration::from_millis(100), db.acquire()).await;
        assert!(blocked.is_err(), "acquire should wait while the pool is empty");

        drop(held);
        let second = tokio::time::timeout(Duration::from_secs(5), db.acquire())
            .await
            .expect("acquire should complete after release")
            .unwrap();
        drop(second);
        assert_eq!(db.idle_connections().await, 1);
    }

    #[tokio::test]
    async fn connect_to_switches_files() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.db");
        let second = dir.path().join("second.db");

        let db = Database::new(&first);
        db.connect().await.unwrap();
        db.connect_to(&second).await.unwrap();

        assert_eq!(db.path().await, second);
        assert!(second.exists());
        assert!(db.is_connected().await);
    }

    #[test]
    fn backup_and_restore_are_not_implemented() {
        let db = Database::new("unused.db");
        assert!(matches!(
            db.backup(Path::new("b.db")),
            Err(SafeError::NotImplemented(_))
        ));
        assert!(matches!(
            db.restore(Path::new("b.db")),
            Err(SafeError::NotImplemented(_))
        ));
    }
}
