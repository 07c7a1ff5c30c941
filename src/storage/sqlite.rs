//! SQLite storage backend

use super::traits::{OpenStore, StorageError, StorageResult};
use crate::config::StoreConfig;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed provenance store
///
/// Uses a single SQLite database file with tables for nodes and relations.
/// Thread-safe via internal mutex on the connection. Several stores may open
/// the same file; label uniqueness is then enforced by the `UNIQUE`
/// constraint rather than by the mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at `path` with explicit settings
    pub fn open_with_config(path: impl AsRef<Path>, config: &StoreConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn, config)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection, config: &StoreConfig) -> StorageResult<()> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if config.wal {
            // journal_mode answers with a row, so it can't go through execute_batch
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }
        Ok(())
    }

    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Nodes: label is the natural key
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL UNIQUE,
                node_type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                metadata_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_type ON nodes(node_type);
            CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

            -- Relations: append-only subject-verb-object statements
            CREATE TABLE IF NOT EXISTS relations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_id INTEGER NOT NULL,
                verb TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                run_id TEXT NOT NULL DEFAULT '',
                start_time TEXT,
                end_time TEXT,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (subject_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (object_id) REFERENCES nodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_relations_verb ON relations(verb);
            CREATE INDEX IF NOT EXISTS idx_relations_subject_verb ON relations(subject_id, verb);
            CREATE INDEX IF NOT EXISTS idx_relations_object_verb ON relations(object_id, verb);
            CREATE INDEX IF NOT EXISTS idx_relations_run_created ON relations(run_id, created_at);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Run `f` against the connection in autocommit mode.
    pub(crate) fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one write transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back on `Err` (and on unwind, since
    /// a dropped `Transaction` rolls back). The write lock is taken up front so
    /// concurrent writers on other connections queue on `busy_timeout`.
    pub(crate) fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, &StoreConfig::default())
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(
            &conn,
            &StoreConfig {
                wal: false,
                ..StoreConfig::default()
            },
        )?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
