//! Durable response store
//!
//! One record per fingerprint holding the serialized [`ResponseState`] and the
//! time it was written. A secondary index on the write time makes
//! oldest-first eviction a cheap range scan.

use crate::error::{IhppError, IhppResult};
use crate::request::Fingerprint;
use crate::response::ResponseState;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A durable record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub hash: Fingerprint,
    pub state: ResponseState,
    /// Write time in milliseconds since the epoch; eviction order only
    pub timestamp: i64,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn stamped(hash: Fingerprint, state: ResponseState) -> Self {
        Self::at(hash, state, Utc::now().timestamp_millis())
    }

    /// Create an entry with an explicit write time
    pub fn at(hash: Fingerprint, state: ResponseState, timestamp: i64) -> Self {
        Self {
            hash,
            state,
            timestamp,
        }
    }
}

/// Asynchronous key-value persistence for response states
///
/// Implementations must make every mutation durable before returning `Ok`.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Read an entry by fingerprint
    async fn get(&self, key: &Fingerprint) -> IhppResult<Option<CacheEntry>>;

    /// Insert or overwrite an entry
    async fn put(&self, entry: &CacheEntry) -> IhppResult<()>;

    /// Remove a single entry (no-op if absent)
    async fn delete(&self, key: &Fingerprint) -> IhppResult<()>;

    /// Remove every entry
    async fn clear(&self) -> IhppResult<()>;

    /// Total number of entries
    async fn count(&self) -> IhppResult<usize>;

    /// Remove the `n` entries with the oldest write time, returning how many
    /// were actually removed
    async fn evict_oldest(&self, n: usize) -> IhppResult<usize>;
}

/// Where the SQLite database lives
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed [`ResponseStore`]
///
/// The connection is opened lazily on first use and kept for the lifetime of
/// the store. Blocking SQLite calls run on the tokio blocking pool.
pub struct SqliteStore {
    location: Location,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS responses (
        hash      TEXT PRIMARY KEY,
        state     TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS responses_timestamp ON responses (timestamp);
";

impl SqliteStore {
    /// Store backed by a database file (created on first use)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: OnceCell::new(),
        }
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: OnceCell::new(),
        }
    }

    /// Database file path, if file-backed
    pub fn path(&self) -> Option<&Path> {
        match self.location {
            Location::File(ref path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Open the connection if needed and return the shared handle
    ///
    /// Idempotent: concurrent callers wait for the same initialization.
    pub async fn open(&self) -> IhppResult<Arc<Mutex<Connection>>> {
        let conn = self
            .conn
            .get_or_try_init(|| {
                let location = self.location.clone();
                async move {
                    let conn = tokio::task::spawn_blocking(move || open_connection(&location))
                        .await??;
                    Ok::<_, IhppError>(Arc::new(Mutex::new(conn)))
                }
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> IhppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> IhppResult<T> + Send + 'static,
    {
        let handle = self.open().await?;
        tokio::task::spawn_blocking(move || {
            let mut conn = handle
                .lock()
                .map_err(|_| IhppError::StoreUnavailable("connection lock poisoned".to_string()))?;
            op(&mut *conn)
        })
        .await?
    }
}

fn open_connection(location: &Location) -> IhppResult<Connection> {
    let conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    IhppError::StoreUnavailable(format!("creating {}: {}", parent.display(), e))
                })?;
            }
            let conn = Connection::open(path).map_err(|e| {
                IhppError::StoreUnavailable(format!("opening {}: {}", path.display(), e))
            })?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            info!("Opened response store at {}", path.display());
            conn
        }
        Location::Memory => Connection::open_in_memory()
            .map_err(|e| IhppError::StoreUnavailable(e.to_string()))?,
    };

    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

#[async_trait]
impl ResponseStore for SqliteStore {
    async fn get(&self, key: &Fingerprint) -> IhppResult<Option<CacheEntry>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT state, timestamp FROM responses WHERE hash = ?1",
                    params![key.as_str()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;

            match row {
                Some((state, timestamp)) => {
                    let state: ResponseState = serde_json::from_str(&state)?;
                    Ok(Some(CacheEntry::at(key, state, timestamp)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn put(&self, entry: &CacheEntry) -> IhppResult<()> {
        let state = serde_json::to_string(&entry.state)?;
        let hash = entry.hash.as_str().to_string();
        let timestamp = entry.timestamp;

        self.with_conn(move |conn| {
            // REPLACE re-inserts the row, so rowid tracks the latest write and
            // breaks ties between equal timestamps
            conn.execute(
                "INSERT OR REPLACE INTO responses (hash, state, timestamp) VALUES (?1, ?2, ?3)",
                params![hash, state, timestamp],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &Fingerprint) -> IhppResult<()> {
        let hash = key.as_str().to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM responses WHERE hash = ?1", params![hash])?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> IhppResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM responses", [])?;
            Ok(())
        })
        .await
    }

    async fn count(&self) -> IhppResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }

    async fn evict_oldest(&self, n: usize) -> IhppResult<usize> {
        if n == 0 {
            return Ok(0);
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM responses WHERE hash IN (
                     SELECT hash FROM responses ORDER BY timestamp ASC, rowid ASC LIMIT ?1
                 )",
                params![limit],
            )?;
            tx.commit()?;
            debug!("Evicted {} oldest responses", deleted);
            Ok(deleted)
        })
        .await
    }
}
