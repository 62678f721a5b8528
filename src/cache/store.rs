//! Async handle onto the shadow cache's SQLite connection (§5: every
//! storage transaction is a suspension point). `rusqlite::Connection` is
//! `Send` but not `Sync` and fully synchronous, so access is serialized
//! through a blocking mutex and every call is moved onto a blocking-pool
//! thread via `spawn_blocking` rather than held across an `.await`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use super::error::CacheError;
use super::schema::{migrate, open_and_migrate};

#[derive(Clone)]
pub struct CacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl CacheStore {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let conn = open_and_migrate(path)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// An ephemeral, unpersisted cache backed by SQLite's `:memory:` mode.
    /// Used by unit and integration tests; not exposed to `main`.
    pub fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory sqlite");
        migrate(&conn).expect("schema migration");
        Self { conn: Arc::new(Mutex::new(conn)) }
    }

    /// Run a blocking closure against the connection on the blocking pool,
    /// yielding the calling task for the duration of the call.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().expect("cache connection mutex poisoned");
            f(&guard)
        })
        .await
        .map_err(|e| CacheError::StorageUnavailable(format!("blocking task panicked: {e}")))?
    }
}
