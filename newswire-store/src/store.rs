//! Deduplicated content storage
//!
//! SQLite-backed store keyed by content hash, partitioned into one table per
//! source. Connectivity is lazy: every operation ensures a live connection
//! first, and the connect path retries forever at a fixed delay while
//! concurrent callers share the one in-flight attempt.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use newswire_core::StoredEntry;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

/// Delay between failed connection attempts.
const RETRY_DELAY: Duration = Duration::from_secs(5);
/// Poll interval for callers waiting on an in-flight connect.
const CONNECT_POLL: Duration = Duration::from_millis(100);

/// Errors from the content store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Store lock poisoned")]
    Lock,

    #[error("Store not connected")]
    NotConnected,

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),
}

#[derive(Default)]
struct StoreState {
    conn: Option<Connection>,
    /// Gates duplicate concurrent connect attempts
    connecting: bool,
}

/// Durable deduplicated key-value persistence, keyed by content hash.
pub struct ContentStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl ContentStore {
    /// Create a store over a database file. No connection is opened until
    /// the first operation (or an explicit [`ContentStore::connect`]).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a connected in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            state: Mutex::new(StoreState {
                conn: Some(conn),
                connecting: false,
            }),
        })
    }

    /// Establish the connection, retrying forever at a fixed delay.
    ///
    /// Only one attempt is ever in flight: concurrent callers wait on the
    /// in-progress attempt instead of opening their own connection.
    pub async fn connect(&self) -> Result<(), StoreError> {
        loop {
            {
                let mut state = self.state.lock().map_err(|_| StoreError::Lock)?;
                if state.conn.is_some() {
                    return Ok(());
                }
                if !state.connecting {
                    state.connecting = true;
                    break;
                }
            }
            // another caller owns the attempt; poll until it lands
            tokio::time::sleep(CONNECT_POLL).await;
        }

        loop {
            match self.open() {
                Ok(conn) => {
                    let mut state = self.state.lock().map_err(|_| StoreError::Lock)?;
                    state.conn = Some(conn);
                    state.connecting = false;
                    info!(path = %self.path.display(), "content store connected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_secs = RETRY_DELAY.as_secs(),
                        "failed to open content store, retrying"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    fn open(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Io(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        Ok(Connection::open(&self.path)?)
    }

    async fn ensure_connected(&self) -> Result<(), StoreError> {
        {
            let state = self.state.lock().map_err(|_| StoreError::Lock)?;
            if state.conn.is_some() {
                return Ok(());
            }
        }
        self.connect().await
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::Lock)?;
        let conn = state.conn.as_ref().ok_or(StoreError::NotConnected)?;
        f(conn).map_err(StoreError::Database)
    }

    /// Whether a table for the source exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![table],
                |row| row.get(0),
            )
        })
    }

    /// Create the source's table if it does not exist yet.
    pub async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        debug!(table, "creating content table");
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} \
                     (hash TEXT PRIMARY KEY, data TEXT, date TIMESTAMP)"
                ),
                [],
            )?;
            Ok(())
        })
    }

    /// Whether a content hash is already stored for the source.
    pub async fn hash_exists(&self, name: &str, hash: &str) -> Result<bool, StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE hash = ?1)"),
                params![hash],
                |row| row.get(0),
            )
        })
    }

    /// Insert one entry. `INSERT OR IGNORE` resolves concurrent double
    /// inserts of the same hash to a single row. Returns whether a row was
    /// written.
    pub async fn insert(
        &self,
        name: &str,
        hash: &str,
        data: &str,
        date: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("INSERT OR IGNORE INTO {table} (hash, data, date) VALUES (?1, ?2, ?3)"),
                params![hash, data, date.timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Fetch one entry by hash.
    pub async fn get(&self, name: &str, hash: &str) -> Result<Option<StoredEntry>, StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT hash, data, date FROM {table} WHERE hash = ?1"),
                params![hash],
                |row| {
                    let hash: String = row.get(0)?;
                    let data: String = row.get(1)?;
                    let date: i64 = row.get(2)?;
                    Ok(StoredEntry {
                        hash,
                        data,
                        date: DateTime::from_timestamp(date, 0).unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()
        })
    }

    /// Number of rows stored for the source.
    pub async fn count(&self, name: &str) -> Result<usize, StoreError> {
        self.ensure_connected().await?;
        let table = table_ident(name)?;
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(count as usize)
        })
    }
}

/// Sanitize a source name into a SQLite table identifier: lowercase, with
/// everything outside `[a-z0-9_]` removed. Table names cannot be bound as
/// parameters, so only sanitized identifiers ever reach the SQL text.
fn table_ident(name: &str) -> Result<String, StoreError> {
    let ident: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let starts_alpha = ident
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_alpha {
        return Err(StoreError::InvalidTableName(name.to_string()));
    }
    Ok(ident)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_exists() {
        let store = ContentStore::in_memory().unwrap();
        assert!(!store.table_exists("WireChannel").await.unwrap());

        store.create_table("WireChannel").await.unwrap();
        assert!(store.table_exists("WireChannel").await.unwrap());
        // lookups are case-insensitive through sanitization
        assert!(store.table_exists("wirechannel").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = ContentStore::in_memory().unwrap();
        store.create_table("wire").await.unwrap();

        let date = DateTime::from_timestamp(1_702_339_200, 0).unwrap();
        assert!(!store.hash_exists("wire", "h1").await.unwrap());
        assert!(store.insert("wire", "h1", "payload", date).await.unwrap());
        assert!(store.hash_exists("wire", "h1").await.unwrap());

        let entry = store.get("wire", "h1").await.unwrap().unwrap();
        assert_eq!(entry.hash, "h1");
        assert_eq!(entry.data, "payload");
        assert_eq!(entry.date, date);

        assert!(store.get("wire", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_ignored() {
        let store = ContentStore::in_memory().unwrap();
        store.create_table("wire").await.unwrap();

        let date = Utc::now();
        assert!(store.insert("wire", "h1", "first", date).await.unwrap());
        assert!(!store.insert("wire", "h1", "second", date).await.unwrap());

        assert_eq!(store.count("wire").await.unwrap(), 1);
        // the original row survives
        let entry = store.get("wire", "h1").await.unwrap().unwrap();
        assert_eq!(entry.data, "first");
    }

    #[tokio::test]
    async fn test_concurrent_insert_resolves_to_one_row() {
        let store = Arc::new(ContentStore::in_memory().unwrap());
        store.create_table("wire").await.unwrap();

        let date = Utc::now();
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert("wire", "h", "data", date).await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.insert("wire", "h", "data", date).await })
        };
        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

        // exactly one of the two writes lands
        assert!(a ^ b);
        assert_eq!(store.count("wire").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lazy_connect_on_first_operation() {
        let path = std::env::temp_dir().join(format!(
            "newswire-store-test-{}-{:?}.db",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_file(&path);

        let store = ContentStore::new(&path);
        store.create_table("wire").await.unwrap();
        assert!(store.table_exists("wire").await.unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_concurrent_connect_is_single_flight() {
        let store = Arc::new(ContentStore::in_memory().unwrap());
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.connect().await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.connect().await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
    }

    #[test]
    fn test_table_ident_sanitization() {
        assert_eq!(table_ident("S2UndergroundWire").unwrap(), "s2undergroundwire");
        assert_eq!(table_ident("daily-brief").unwrap(), "dailybrief");
        assert_eq!(table_ident("wire_2").unwrap(), "wire_2");
        assert!(table_ident("").is_err());
        assert!(table_ident("123channel").is_err());
        assert!(table_ident("---").is_err());
    }
}
